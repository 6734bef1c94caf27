//! Note service: apply client mutations with last-write-wins arbitration.
//!
//! DESIGN
//! ======
//! Creates insert the full record sent by the client. Updates are applied
//! only when the patch's `updated_at` is at least the stored note's
//! `updated_at`; older patches arrived out of order and are ignored, not
//! rejected. Deletes are idempotent. Every outcome reports the board it
//! touched so the hub knows whom to push a fresh snapshot to.

#[cfg(test)]
#[path = "object_test.rs"]
mod object_test;

use canvas::doc::{BoardId, Note, NoteId, NotePatch};
use canvas::error::{ErrorCode, SyncError};
use canvas::sync::Mutation;
use tracing::debug;

use crate::state::HubState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectError {
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),
    #[error("note {note} belongs to board {board}, not {claimed}")]
    BoardMismatch { note: NoteId, board: BoardId, claimed: BoardId },
}

impl ErrorCode for ObjectError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BoardNotFound(_) => "E_BOARD_NOT_FOUND",
            Self::BoardMismatch { .. } => "E_BOARD_MISMATCH",
        }
    }
}

impl From<ObjectError> for SyncError {
    fn from(err: ObjectError) -> Self {
        match err {
            ObjectError::BoardNotFound(id) => SyncError::BoardNotFound(id),
            ObjectError::BoardMismatch { .. } => SyncError::Rejected(err.to_string()),
        }
    }
}

/// What a mutation did to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created(BoardId),
    Updated(BoardId),
    /// Older than the stored note; nothing changed.
    Stale(BoardId),
    Deleted(BoardId),
    /// Update or delete for a note no board has.
    Missing,
}

impl Outcome {
    /// The board whose subscribers should see a new snapshot.
    #[must_use]
    pub fn changed_board(self) -> Option<BoardId> {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Deleted(id) => Some(id),
            Self::Stale(_) | Self::Missing => None,
        }
    }
}

// =============================================================================
// APPLY
// =============================================================================

/// Apply one mutation.
///
/// # Errors
///
/// `BoardNotFound` when a create names an unknown board; `BoardMismatch` when
/// a create reuses a note id that lives on another board.
pub fn apply_mutation(state: &mut HubState, mutation: Mutation) -> Result<Outcome, ObjectError> {
    match mutation {
        Mutation::CreateNote(note) => create_note(state, note),
        Mutation::UpdateNote { id, patch } => Ok(update_note(state, id, &patch)),
        Mutation::DeleteNote { id } => Ok(delete_note(state, id)),
    }
}

fn create_note(state: &mut HubState, note: Note) -> Result<Outcome, ObjectError> {
    if let Some(existing) = state.board_of(&note.id) {
        if existing != note.board_id {
            return Err(ObjectError::BoardMismatch { note: note.id, board: existing, claimed: note.board_id });
        }
    }
    let board_id = note.board_id;
    let board = state.boards.get_mut(&board_id).ok_or(ObjectError::BoardNotFound(board_id))?;

    if let Some(current) = board.notes.get(&note.id) {
        if note.updated_at < current.updated_at {
            debug!(id = %note.id, "stale create ignored");
            return Ok(Outcome::Stale(board_id));
        }
    }
    debug!(id = %note.id, %board_id, "note created");
    board.notes.insert(note.id, note);
    Ok(Outcome::Created(board_id))
}

fn update_note(state: &mut HubState, id: NoteId, patch: &NotePatch) -> Outcome {
    let Some(board_id) = state.board_of(&id) else {
        debug!(%id, "update for unknown note ignored");
        return Outcome::Missing;
    };
    let Some(note) = state.boards.get_mut(&board_id).and_then(|board| board.notes.get_mut(&id)) else {
        return Outcome::Missing;
    };

    // A patch without a stamp cannot be ordered; treat it as current.
    let incoming = patch.updated_at.unwrap_or(note.updated_at);
    if incoming < note.updated_at {
        debug!(%id, incoming, current = note.updated_at, "stale update ignored");
        return Outcome::Stale(board_id);
    }
    patch.apply_to(note);
    note.updated_at = incoming;
    Outcome::Updated(board_id)
}

fn delete_note(state: &mut HubState, id: NoteId) -> Outcome {
    let Some(board_id) = state.board_of(&id) else {
        debug!(%id, "delete for unknown note ignored");
        return Outcome::Missing;
    };
    if let Some(board) = state.boards.get_mut(&board_id) {
        board.notes.remove(&id);
    }
    debug!(%id, %board_id, "note deleted");
    Outcome::Deleted(board_id)
}
