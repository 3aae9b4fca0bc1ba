//! Note reconciliation.
//!
//! A sync source pushes batches of notes keyed by `(source, source_identifier)`.
//! Known keys are updated in place, everything else is inserted with a fresh
//! slug, so pushing the same batch twice leaves the store unchanged.
//!
//! There is no batch transaction. A failing note stops the batch and notes
//! before it stay applied; re-syncing is safe because applied notes match on
//! their key and become updates.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::NoteError;
use super::slug::{candidates, derive_slug};
use crate::models::{IncomingNote, NewNote, Note};
use crate::store::{Constraint, NoteStore, StoreError};

/// Outcome of a successful reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
}

impl ReconcileReport {
    pub fn applied(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Merge a batch of incoming notes into `owner`'s notes.
pub async fn reconcile<S: NoteStore + ?Sized>(
    store: &S,
    owner: Uuid,
    notes: Vec<IncomingNote>,
) -> Result<ReconcileReport, NoteError> {
    if notes.is_empty() {
        return Err(NoteError::EmptyBatch);
    }

    let mut known = store.note_keys(owner).await?;
    let mut report = ReconcileReport::default();

    for (index, mut incoming) in notes.into_iter().enumerate() {
        // The key must match the stored, trimmed source.
        incoming.source = incoming.source.trim().to_string();
        let key = incoming.key();
        let matchable = incoming.is_matchable();
        match apply(store, owner, incoming, matchable && known.contains(&key)).await {
            Ok(Applied::Updated) => report.updated += 1,
            Ok(Applied::Inserted(note)) => {
                debug!(note_id = %note.id, slug = %note.slug, "note inserted");
                report.inserted += 1;
                if matchable {
                    known.insert(key);
                }
            }
            Err(e) => {
                warn!(user_id = %owner, index, applied = report.applied(), error = %e, "reconcile aborted");
                return Err(NoteError::Batch {
                    index,
                    applied: report.applied(),
                    source: Box::new(e),
                });
            }
        }
    }

    info!(user_id = %owner, inserted = report.inserted, updated = report.updated, "notes reconciled");
    Ok(report)
}

enum Applied {
    Inserted(Note),
    Updated,
}

async fn apply<S: NoteStore + ?Sized>(
    store: &S,
    owner: Uuid,
    incoming: IncomingNote,
    known: bool,
) -> Result<Applied, NoteError> {
    if incoming.source.is_empty() {
        return Err(NoteError::Validation("note source is required".into()));
    }

    let now = Utc::now();
    let created_at = incoming.created_at.unwrap_or(now);
    let mut row = NewNote {
        user_id: owner,
        source: incoming.source,
        source_identifier: incoming.source_identifier,
        title: incoming.title,
        body: incoming.body,
        slug: String::new(),
        created_at,
        updated_at: incoming.updated_at.unwrap_or(created_at),
    };

    if known {
        if store.update_note(&row).await? {
            return Ok(Applied::Updated);
        }
        // Deleted since the keys were read.
        debug!(source = %row.source, identifier = %row.source_identifier, "known note vanished, inserting");
    }

    let base = match incoming.slug.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => explicit.to_string(),
        _ => derive_slug(&row.title),
    };
    insert_with_free_slug(store, &mut row, &base).await.map(Applied::Inserted)
}

async fn insert_with_free_slug<S: NoteStore + ?Sized>(
    store: &S,
    row: &mut NewNote,
    base: &str,
) -> Result<Note, NoteError> {
    for slug in candidates(base) {
        row.slug = slug;
        match store.insert_note(row).await {
            Ok(note) => return Ok(note),
            Err(StoreError::UniqueViolation(Constraint::NoteSlug)) => {
                debug!(slug = %row.slug, "slug taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(NoteError::Conflict(Constraint::NoteSlug))
}
