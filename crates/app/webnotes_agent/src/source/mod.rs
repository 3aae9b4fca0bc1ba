//! Local note sources the agent can extract from.

pub mod apple_notes;
pub mod directory;

use webnotes_core::models::IncomingNote;

use crate::Result;

pub use apple_notes::AppleNotes;
pub use directory::DirectorySource;

/// Something that can produce the current set of notes.
///
/// Extraction is blocking (it shells out or walks the filesystem); the
/// worker runs it off the async runtime.
pub trait NoteSource: Send + Sync {
    /// Origin tag stamped on every extracted note.
    fn tag(&self) -> &'static str;

    fn extract(&self) -> Result<Vec<IncomingNote>>;
}
