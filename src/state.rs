//! In-memory hub state.
//!
//! DESIGN
//! ======
//! `HubState` stands in for the external sync service: it holds every board
//! with its notes and reserved shapes, the open board subscriptions, and the
//! presence rooms. The hub and all clients share one thread, so the state
//! lives behind `Rc<RefCell<_>>` and every service function takes a plain
//! `&mut HubState`. No borrow is held across an `.await`.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use std::collections::HashMap;

use canvas::doc::{Board, BoardId, BoardSnapshot, Note, NoteId, Shape};
use canvas::error::SyncError;
use canvas::presence::PresenceRecord;
use canvas::sync::{ConnectionId, PeerEvent, QueryState, RoomId};
use futures::channel::mpsc;

// =============================================================================
// BOARD STATE
// =============================================================================

/// One board and everyone subscribed to it.
pub struct BoardState {
    pub board: Board,
    /// Current notes keyed by note ID.
    pub notes: HashMap<NoteId, Note>,
    pub shapes: Vec<Shape>,
    /// Open subscriptions; closed ones are pruned on the next push.
    pub subscribers: Vec<mpsc::UnboundedSender<QueryState>>,
}

impl BoardState {
    #[must_use]
    pub fn new(board: Board) -> Self {
        Self { board, notes: HashMap::new(), shapes: Vec::new(), subscribers: Vec::new() }
    }

    /// The board with its notes, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        let mut notes: Vec<Note> = self.notes.values().cloned().collect();
        notes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        BoardSnapshot { board: self.board.clone(), notes, shapes: self.shapes.clone() }
    }
}

// =============================================================================
// PRESENCE ROOMS
// =============================================================================

/// One live connection in a presence room.
pub struct Member {
    pub record: PresenceRecord,
    pub events: mpsc::UnboundedSender<PeerEvent>,
}

/// Connections currently in one room.
#[derive(Default)]
pub struct RoomState {
    pub members: HashMap<ConnectionId, Member>,
}

// =============================================================================
// HUB STATE
// =============================================================================

#[derive(Default)]
pub struct HubState {
    pub boards: HashMap<BoardId, BoardState>,
    pub rooms: HashMap<RoomId, RoomState>,
    /// Injected failure for the next `transact` call.
    pub fail_next: Option<SyncError>,
}

impl HubState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The board a note lives on, if any board has it.
    #[must_use]
    pub fn board_of(&self, note_id: &NoteId) -> Option<BoardId> {
        self.boards.iter().find(|(_, board)| board.notes.contains_key(note_id)).map(|(id, _)| *id)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
