use canvas::doc::{Note, NoteColor, NotePatch};
use futures::StreamExt;
use uuid::Uuid;

use super::*;
use crate::state::test_helpers::{self, T0};

fn hub_with_board() -> (MemoryHub, BoardId) {
    let hub = MemoryHub::new();
    let board = hub.create_board("Retro", Some("user-1".into()), T0);
    (hub, board.id)
}

async fn next_snapshot(stream: &mut LocalBoxStream<'static, QueryState>) -> BoardSnapshot {
    match stream.next().await {
        Some(QueryState::Ready(Some(snap))) => snap,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

fn stamped(id: Uuid, patch: NotePatch, at: i64) -> Mutation {
    Mutation::UpdateNote { id, patch: NotePatch { updated_at: Some(at), ..patch } }
}

// =============================================================================
// SYNC SERVICE
// =============================================================================

#[tokio::test]
async fn subscribe_yields_current_board() {
    let (hub, board_id) = hub_with_board();
    let mut sub = hub.subscribe(&BoardQuery::new(board_id));
    let snap = next_snapshot(&mut sub).await;
    assert_eq!(snap.board.id, board_id);
    assert_eq!(snap.board.name, "Retro");
    assert!(snap.notes.is_empty());
}

#[tokio::test]
async fn subscribe_to_missing_board_yields_none() {
    let hub = MemoryHub::new();
    let mut sub = hub.subscribe(&BoardQuery::new(Uuid::new_v4()));
    assert_eq!(sub.next().await, Some(QueryState::Ready(None)));
}

#[tokio::test]
async fn transact_pushes_snapshot_to_subscribers() {
    let (hub, board_id) = hub_with_board();
    let mut sub = hub.subscribe(&BoardQuery::new(board_id));
    next_snapshot(&mut sub).await;

    let note = test_helpers::note(board_id, T0);
    hub.transact(vec![Mutation::CreateNote(note.clone())]).await.unwrap();

    let snap = next_snapshot(&mut sub).await;
    assert_eq!(snap.notes, vec![note]);
}

#[tokio::test]
async fn batch_pushes_one_snapshot_per_board() {
    let (hub, board_id) = hub_with_board();
    let mut sub = hub.subscribe(&BoardQuery::new(board_id));
    next_snapshot(&mut sub).await;

    let note = test_helpers::note(board_id, T0);
    let batch = vec![
        Mutation::CreateNote(note.clone()),
        stamped(note.id, NotePatch::content("edited"), T0 + 1),
        stamped(note.id, NotePatch::color(NoteColor::Green), T0 + 2),
    ];
    hub.transact(batch).await.unwrap();

    let snap = next_snapshot(&mut sub).await;
    assert_eq!(snap.notes[0].content, "edited");
    assert_eq!(snap.notes[0].color, NoteColor::Green);
    drop(hub);
    assert_eq!(sub.next().await, None);
}

#[tokio::test]
async fn reversed_updates_keep_later_write() {
    let (hub, board_id) = hub_with_board();
    let note = test_helpers::note(board_id, T0);
    hub.transact(vec![Mutation::CreateNote(note.clone())]).await.unwrap();

    hub.transact(vec![stamped(note.id, NotePatch::content("later"), T0 + 20)]).await.unwrap();
    hub.transact(vec![stamped(note.id, NotePatch::content("earlier"), T0 + 10)]).await.unwrap();

    let stored: Note = hub.snapshot(&board_id).unwrap().notes.remove(0);
    assert_eq!(stored.content, "later");
    assert_eq!(stored.updated_at, T0 + 20);
}

#[tokio::test]
async fn stale_update_pushes_nothing() {
    let (hub, board_id) = hub_with_board();
    let note = test_helpers::note(board_id, T0 + 50);
    hub.transact(vec![Mutation::CreateNote(note.clone())]).await.unwrap();
    let mut sub = hub.subscribe(&BoardQuery::new(board_id));
    next_snapshot(&mut sub).await;

    hub.transact(vec![stamped(note.id, NotePatch::content("old"), T0)]).await.unwrap();
    assert!(futures::FutureExt::now_or_never(sub.next()).is_none());
}

#[tokio::test]
async fn delete_is_idempotent_through_transact() {
    let (hub, board_id) = hub_with_board();
    let note = test_helpers::note(board_id, T0);
    hub.transact(vec![Mutation::CreateNote(note.clone())]).await.unwrap();

    hub.transact(vec![Mutation::DeleteNote { id: note.id }]).await.unwrap();
    hub.transact(vec![Mutation::DeleteNote { id: note.id }]).await.unwrap();
    assert!(hub.snapshot(&board_id).unwrap().notes.is_empty());
}

#[tokio::test]
async fn create_on_missing_board_is_rejected() {
    let hub = MemoryHub::new();
    let note = test_helpers::note(Uuid::new_v4(), T0);
    let err = hub.transact(vec![Mutation::CreateNote(note.clone())]).await.unwrap_err();
    assert_eq!(err, SyncError::BoardNotFound(note.board_id));
}

#[tokio::test]
async fn injected_failure_applies_nothing_once() {
    let (hub, board_id) = hub_with_board();
    hub.fail_next_transact(SyncError::Transport("offline".into()));

    let note = test_helpers::note(board_id, T0);
    let err = hub.transact(vec![Mutation::CreateNote(note.clone())]).await.unwrap_err();
    assert_eq!(err, SyncError::Transport("offline".into()));
    assert!(hub.snapshot(&board_id).unwrap().notes.is_empty());

    hub.transact(vec![Mutation::CreateNote(note)]).await.unwrap();
    assert_eq!(hub.snapshot(&board_id).unwrap().notes.len(), 1);
}

#[tokio::test]
async fn fail_subscriptions_reports_to_subscribers() {
    let (hub, board_id) = hub_with_board();
    let mut sub = hub.subscribe(&BoardQuery::new(board_id));
    next_snapshot(&mut sub).await;

    assert_eq!(hub.fail_subscriptions(&board_id, "replica lagging"), 1);
    assert_eq!(sub.next().await, Some(QueryState::Failed("replica lagging".into())));
}

// =============================================================================
// PRESENCE TRANSPORT
// =============================================================================

#[tokio::test]
async fn presence_fans_out_between_clones() {
    let (hub, board_id) = hub_with_board();
    let room = RoomId::board(board_id);
    let other = hub.clone();

    let mut alice = hub.join(&room, test_helpers::record("alice"));
    let bob = other.join(&room, test_helpers::record("bob"));
    assert_eq!(
        alice.events.next().await,
        Some(canvas::sync::PeerEvent::Upsert { connection: bob.connection, record: test_helpers::record("bob") })
    );

    other.publish(&room, bob.connection, PresencePatch { cursor_x: Some(9.0), ..PresencePatch::default() });
    let Some(canvas::sync::PeerEvent::Upsert { record, .. }) = alice.events.next().await else {
        panic!("expected cursor update");
    };
    assert!((record.cursor_x - 9.0).abs() < f64::EPSILON);

    other.leave(&room, bob.connection);
    assert_eq!(alice.events.next().await, Some(canvas::sync::PeerEvent::Left { connection: bob.connection }));
    assert_eq!(hub.members(&room).len(), 1);
}
