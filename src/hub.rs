//! In-process sync hub.
//!
//! `MemoryHub` implements the client-facing [`SyncService`] and
//! [`PresenceTransport`] traits on top of the hub services. Cloning a hub
//! shares its state, so every simulated client can hold its own handle.

#[cfg(test)]
#[path = "hub_test.rs"]
mod hub_test;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use async_trait::async_trait;
use canvas::doc::{Board, BoardId, BoardSnapshot, UserId};
use canvas::error::{ErrorCode, SyncError};
use canvas::presence::{PresencePatch, PresenceRecord};
use canvas::sync::{
    BoardQuery, ConnectionId, Mutation, PresenceTransport, QueryState, RoomId, RoomSubscription, SyncService,
};
use futures::stream::LocalBoxStream;
use tracing::{debug, warn};

use crate::services::{board, cursor, object};
use crate::state::HubState;

#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Rc<RefCell<HubState>>,
}

impl MemoryHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty board, as the dashboard would.
    pub fn create_board(&self, name: &str, creator: Option<UserId>, created_at: i64) -> Board {
        board::create_board(&mut self.state.borrow_mut(), name, creator, created_at)
    }

    /// The hub's current view of a board.
    #[must_use]
    pub fn snapshot(&self, board_id: &BoardId) -> Option<BoardSnapshot> {
        board::snapshot(&self.state.borrow(), board_id)
    }

    /// Make the next `transact` call fail with `err` without applying anything.
    pub fn fail_next_transact(&self, err: SyncError) {
        self.state.borrow_mut().fail_next = Some(err);
    }

    /// Push a `Failed` state to every subscriber of a board. Returns how many received it.
    pub fn fail_subscriptions(&self, board_id: &BoardId, message: &str) -> usize {
        board::publish_failure(&mut self.state.borrow_mut(), board_id, message)
    }

    /// Live members of a presence room.
    #[must_use]
    pub fn members(&self, room: &RoomId) -> Vec<(ConnectionId, PresenceRecord)> {
        cursor::members(&self.state.borrow(), room)
    }
}

#[async_trait(?Send)]
impl SyncService for MemoryHub {
    fn subscribe(&self, query: &BoardQuery) -> LocalBoxStream<'static, QueryState> {
        board::subscribe(&mut self.state.borrow_mut(), query.board_id)
    }

    async fn transact(&self, mutations: Vec<Mutation>) -> Result<(), SyncError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.fail_next.take() {
            warn!(error = %err, code = err.error_code(), "injected transact failure");
            return Err(err);
        }

        let mut changed = BTreeSet::new();
        let mut result = Ok(());
        for mutation in mutations {
            let note_id = mutation.note_id();
            match object::apply_mutation(&mut state, mutation) {
                Ok(outcome) => {
                    debug!(%note_id, ?outcome, "mutation applied");
                    changed.extend(outcome.changed_board());
                }
                Err(e) => {
                    warn!(%note_id, error = %e, code = e.error_code(), "mutation rejected");
                    result = Err(e.into());
                    break;
                }
            }
        }

        for board_id in &changed {
            let delivered = board::publish_snapshot(&mut state, board_id);
            debug!(%board_id, delivered, "snapshot pushed");
        }
        result
    }
}

impl PresenceTransport for MemoryHub {
    fn join(&self, room: &RoomId, initial: PresenceRecord) -> RoomSubscription {
        cursor::join(&mut self.state.borrow_mut(), *room, initial)
    }

    fn publish(&self, room: &RoomId, connection: ConnectionId, patch: PresencePatch) {
        cursor::publish(&mut self.state.borrow_mut(), *room, connection, &patch);
    }

    fn leave(&self, room: &RoomId, connection: ConnectionId) {
        cursor::leave(&mut self.state.borrow_mut(), *room, connection);
    }
}
