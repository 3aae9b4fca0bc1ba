//! Domain models.
//!
//! Internal domain types shared by the store, the session protocol and the
//! note reconciler. HTTP-specific shapes live in `webnotes_api`.

pub mod account;
pub mod activity;
pub mod note;

pub use account::{Account, NewAccount, PublicProfile};
pub use activity::{Activity, ActivityKind, NewActivity};
pub use note::{IncomingNote, NewNote, Note, NoteKey, NoteSummary};
