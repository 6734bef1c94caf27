//! Error types shared across the engine.

use crate::doc::{BoardId, NoteId};

/// Failure reported by the external sync collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The transport could not deliver the request.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service received the request and refused it.
    #[error("mutation rejected: {0}")]
    Rejected(String),
    /// The subscribed or mutated board does not exist.
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),
    /// The local side of the channel went away before a result arrived.
    #[error("sync channel closed")]
    Closed,
}

/// Failure applying a local edit to the note store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("note not found: {0}")]
    NotFound(NoteId),
    #[error("empty patch for note {0}")]
    EmptyPatch(NoteId),
}

/// Stable machine-readable code for an error, used in logs and host UI.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

impl ErrorCode for SyncError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E_TRANSPORT",
            Self::Rejected(_) => "E_REJECTED",
            Self::BoardNotFound(_) => "E_BOARD_NOT_FOUND",
            Self::Closed => "E_CLOSED",
        }
    }
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOTE_NOT_FOUND",
            Self::EmptyPatch(_) => "E_EMPTY_PATCH",
        }
    }
}
