//! Read access and publishing.
//!
//! A note is visible to its owner, and to everybody once deployed. Anything
//! else reads as [`NoteError::NotFound`], whether or not the note exists.

use tracing::info;
use uuid::Uuid;

use super::NoteError;
use crate::models::{Note, NoteSummary};
use crate::store::{AccountStore, NoteStore};

/// Whether `viewer` may read `note`.
pub fn can_view(note: &Note, viewer: Option<Uuid>) -> bool {
    note.deployed || viewer == Some(note.user_id)
}

fn visible(note: Option<Note>, viewer: Option<Uuid>) -> Result<Note, NoteError> {
    note.filter(|n| can_view(n, viewer))
        .ok_or(NoteError::NotFound)
}

/// Fetch a note by id if `viewer` may see it.
pub async fn visible_note_by_id<S: NoteStore + ?Sized>(
    store: &S,
    id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Note, NoteError> {
    visible(store.note_by_id(id).await?, viewer)
}

/// Fetch a note by its owner's username and slug if `viewer` may see it.
pub async fn visible_note_by_slug<S: AccountStore + NoteStore + ?Sized>(
    store: &S,
    username: &str,
    slug: &str,
    viewer: Option<Uuid>,
) -> Result<Note, NoteError> {
    let Some(owner) = store.account_by_username(username).await? else {
        return Err(NoteError::NotFound);
    };
    visible(store.note_by_slug(owner.id, slug).await?, viewer)
}

/// Deployed notes of the account named `username`.
pub async fn deployed_notes_of<S: AccountStore + NoteStore + ?Sized>(
    store: &S,
    username: &str,
) -> Result<Vec<NoteSummary>, NoteError> {
    let Some(owner) = store.account_by_username(username).await? else {
        return Err(NoteError::NotFound);
    };
    Ok(store.list_notes(owner.id, true).await?)
}

/// Publish or unpublish a note the caller owns.
pub async fn set_deployed<S: NoteStore + ?Sized>(
    store: &S,
    id: Uuid,
    owner: Uuid,
    deployed: bool,
) -> Result<(), NoteError> {
    if !store.set_deployed(id, owner, deployed).await? {
        return Err(NoteError::NotFound);
    }
    info!(user_id = %owner, note_id = %id, deployed, "note deployment changed");
    Ok(())
}
