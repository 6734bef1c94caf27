//! Board service: creation, snapshots, and subscription fan-out.
//!
//! DESIGN
//! ======
//! A subscription is an unbounded channel of `QueryState`. Subscribing to a
//! known board pushes the current snapshot immediately; subscribing to an
//! unknown board pushes `Ready(None)`. After every accepted write the whole
//! board is pushed again to every open subscription. Receivers that have been
//! dropped are pruned on the next push.

#[cfg(test)]
#[path = "board_test.rs"]
mod board_test;

use canvas::doc::{Board, BoardId, BoardSnapshot, UserId};
use canvas::sync::QueryState;
use futures::channel::mpsc;
use futures::stream::LocalBoxStream;
use futures::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::{BoardState, HubState};

/// Create an empty board.
pub fn create_board(state: &mut HubState, name: &str, creator: Option<UserId>, created_at: i64) -> Board {
    let board = Board { id: Uuid::new_v4(), name: name.to_owned(), created_at, creator };
    state.boards.insert(board.id, BoardState::new(board.clone()));
    info!(board_id = %board.id, %name, "board created");
    board
}

#[must_use]
pub fn snapshot(state: &HubState, board_id: &BoardId) -> Option<BoardSnapshot> {
    state.boards.get(board_id).map(BoardState::snapshot)
}

/// Open a subscription. The first item is the board's current state.
pub fn subscribe(state: &mut HubState, board_id: BoardId) -> LocalBoxStream<'static, QueryState> {
    let (tx, rx) = mpsc::unbounded();
    match state.boards.get_mut(&board_id) {
        Some(board) => {
            if tx.unbounded_send(QueryState::Ready(Some(board.snapshot()))).is_ok() {
                board.subscribers.push(tx);
            }
            debug!(%board_id, subscribers = board.subscribers.len(), "subscribed");
        }
        None => {
            debug!(%board_id, "subscribed to unknown board");
            if tx.unbounded_send(QueryState::Ready(None)).is_err() {
                debug!(%board_id, "subscriber gone before first push");
            }
        }
    }
    rx.boxed_local()
}

/// Push the current snapshot to every open subscription. Returns how many received it.
pub fn publish_snapshot(state: &mut HubState, board_id: &BoardId) -> usize {
    let Some(board) = state.boards.get_mut(board_id) else {
        return 0;
    };
    let snapshot = board.snapshot();
    push(board, &QueryState::Ready(Some(snapshot)))
}

/// Report a subscription failure to every open subscription of a board.
pub fn publish_failure(state: &mut HubState, board_id: &BoardId, message: &str) -> usize {
    let Some(board) = state.boards.get_mut(board_id) else {
        return 0;
    };
    push(board, &QueryState::Failed(message.to_owned()))
}

fn push(board: &mut BoardState, item: &QueryState) -> usize {
    let before = board.subscribers.len();
    board.subscribers.retain(|tx| tx.unbounded_send(item.clone()).is_ok());
    let pruned = before - board.subscribers.len();
    if pruned > 0 {
        debug!(board_id = %board.board.id, pruned, "dropped closed subscriptions");
    }
    board.subscribers.len()
}
