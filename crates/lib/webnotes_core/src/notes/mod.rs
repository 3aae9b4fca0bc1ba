//! Notes: sync reconciliation, slugs and read access.

pub mod access;
pub mod reconcile;
pub mod slug;

use thiserror::Error;

use crate::store::{Constraint, StoreError};

pub use access::{can_view, deployed_notes_of, set_deployed, visible_note_by_id, visible_note_by_slug};
pub use reconcile::{ReconcileReport, reconcile};

/// Note errors.
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("no notes provided")]
    EmptyBatch,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(Constraint),

    /// Missing, or not visible to the requester.
    #[error("note not found")]
    NotFound,

    #[error(transparent)]
    Store(StoreError),

    #[error("note {index} failed after {applied} applied: {source}")]
    Batch {
        index: usize,
        applied: usize,
        source: Box<NoteError>,
    },
}

impl NoteError {
    /// The error behind a batch failure, or `self`.
    pub fn root(&self) -> &NoteError {
        match self {
            NoteError::Batch { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<StoreError> for NoteError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(constraint) => NoteError::Conflict(constraint),
            StoreError::NotFound => NoteError::NotFound,
            other => NoteError::Store(other),
        }
    }
}
