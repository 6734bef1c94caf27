use uuid::Uuid;

use super::*;
use crate::state::test_helpers::{self, T0};

#[test]
fn hub_state_new_is_empty() {
    let state = HubState::new();
    assert!(state.boards.is_empty());
    assert!(state.rooms.is_empty());
    assert!(state.fail_next.is_none());
}

#[test]
fn board_state_new_is_empty() {
    let board = Board { id: Uuid::new_v4(), name: "Retro".into(), created_at: T0, creator: None };
    let bs = BoardState::new(board.clone());
    assert_eq!(bs.board, board);
    assert!(bs.notes.is_empty());
    assert!(bs.shapes.is_empty());
    assert!(bs.subscribers.is_empty());
}

#[test]
fn snapshot_orders_notes_by_creation() {
    let mut state = HubState::new();
    let board_id = test_helpers::seed_board(&mut state);
    let mut late = test_helpers::note(board_id, T0);
    late.created_at = T0 + 50;
    let early = test_helpers::note(board_id, T0);
    test_helpers::seed_note(&mut state, late.clone());
    test_helpers::seed_note(&mut state, early.clone());

    let snap = state.boards[&board_id].snapshot();
    let ids: Vec<_> = snap.notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![early.id, late.id]);
    assert_eq!(snap.board.id, board_id);
}

#[test]
fn snapshot_breaks_creation_ties_by_id() {
    let mut state = HubState::new();
    let board_id = test_helpers::seed_board(&mut state);
    let a = test_helpers::note(board_id, T0);
    let b = test_helpers::note(board_id, T0);
    test_helpers::seed_note(&mut state, a.clone());
    test_helpers::seed_note(&mut state, b.clone());

    let snap = state.boards[&board_id].snapshot();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(snap.notes.iter().map(|n| n.id).collect::<Vec<_>>(), expected);
}

#[test]
fn board_of_finds_owning_board() {
    let mut state = HubState::new();
    let first = test_helpers::seed_board(&mut state);
    let second = test_helpers::seed_board(&mut state);
    let note = test_helpers::note(second, T0);
    test_helpers::seed_note(&mut state, note.clone());

    assert_eq!(state.board_of(&note.id), Some(second));
    assert_ne!(state.board_of(&note.id), Some(first));
    assert_eq!(state.board_of(&Uuid::new_v4()), None);
}
