#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::sync::ManualClock;
use crate::test_helpers::{RecordingPresence, clock, identity};

fn joined(min_interval_ms: u64) -> (PresenceChannel, Rc<RecordingPresence>, Rc<ManualClock>) {
    let transport = Rc::new(RecordingPresence::default());
    let clock = clock();
    let (channel, _events) = PresenceChannel::join(
        transport.clone(),
        clock.clone(),
        Uuid::new_v4(),
        &identity("user-42", Some("dana@example.com")),
        min_interval_ms,
    );
    (channel, transport, clock)
}

fn record(name: &str) -> PresenceRecord {
    PresenceRecord { name: name.to_owned(), color: "#3B82F6".to_owned(), cursor_x: 1.0, cursor_y: 2.0 }
}

// =============================================================
// Identity
// =============================================================

#[test]
fn display_name_is_email_local_part() {
    assert_eq!(identity("u", Some("dana@example.com")).display_name(), "dana");
}

#[test]
fn display_name_without_email_is_anonymous() {
    assert_eq!(identity("u", None).display_name(), "Anonymous");
    assert_eq!(identity("u", Some("@example.com")).display_name(), "Anonymous");
    assert_eq!(identity("u", Some("")).display_name(), "Anonymous");
}

#[test]
fn initial_letter_is_uppercased() {
    assert_eq!(record("dana").initial_letter(), Some('D'));
    assert_eq!(record("").initial_letter(), None);
}

#[test]
fn record_uses_camel_case_on_the_wire() {
    let value = serde_json::to_value(record("dana")).unwrap();
    assert_eq!(value["cursorX"], serde_json::json!(1.0));
    assert_eq!(value["cursorY"], serde_json::json!(2.0));
}

// =============================================================
// Join / publish
// =============================================================

#[test]
fn join_announces_name_color_and_origin_cursor() {
    let (channel, transport, _clock) = joined(0);

    let joins = transport.joined.borrow();
    assert_eq!(joins.len(), 1);
    let (room, initial) = &joins[0];
    assert_eq!(room.kind, "board");
    assert_eq!(initial.name, "dana");
    assert_eq!(initial.color, cursor_color("user-42"));
    assert_eq!((initial.cursor_x, initial.cursor_y), (0.0, 0.0));
    assert_eq!(channel.connection(), transport.connection);
    assert_eq!(channel.online_count(), 1);
}

#[test]
fn every_move_is_published_by_default() {
    let (mut channel, transport, _clock) = joined(0);

    for i in 0..3 {
        assert!(channel.publish_cursor(Point::new(f64::from(i), 0.0)));
    }

    assert_eq!(transport.published.borrow().len(), 3);
    assert_eq!(channel.me().cursor_x, 2.0);
}

#[test]
fn interval_holds_back_moves_until_flush() {
    let (mut channel, transport, clock) = joined(100);

    assert!(channel.publish_cursor(Point::new(1.0, 1.0)));
    clock.advance(10);
    assert!(!channel.publish_cursor(Point::new(2.0, 2.0)));
    assert!(!channel.publish_cursor(Point::new(3.0, 3.0)));
    assert_eq!(transport.published.borrow().len(), 1);

    assert!(channel.flush());
    assert!(!channel.flush(), "nothing left to flush");

    let published = transport.published.borrow();
    assert_eq!(published.len(), 2);
    assert_eq!(published[1], PresencePatch::cursor(Point::new(3.0, 3.0)));
}

#[test]
fn held_back_cursor_reports_time_until_due() {
    let (mut channel, _transport, clock) = joined(100);
    assert_eq!(channel.held_back_ms(), None);

    channel.publish_cursor(Point::new(1.0, 1.0));
    assert_eq!(channel.held_back_ms(), None, "nothing waiting after a send");
    clock.advance(30);
    channel.publish_cursor(Point::new(2.0, 2.0));
    assert_eq!(channel.held_back_ms(), Some(70));

    clock.advance(500);
    assert_eq!(channel.held_back_ms(), Some(0));
    channel.flush();
    assert_eq!(channel.held_back_ms(), None);
}

#[test]
fn interval_elapsed_publishes_immediately() {
    let (mut channel, transport, clock) = joined(100);
    channel.publish_cursor(Point::new(1.0, 1.0));
    clock.advance(100);

    assert!(channel.publish_cursor(Point::new(2.0, 2.0)));
    assert_eq!(transport.published.borrow().len(), 2);
}

// =============================================================
// Peers
// =============================================================

#[test]
fn upsert_and_leave_track_peers() {
    let (mut channel, _transport, _clock) = joined(0);
    let peer = Uuid::new_v4();

    assert!(channel.apply(PeerEvent::Upsert { connection: peer, record: record("amy") }));
    assert!(!channel.apply(PeerEvent::Upsert { connection: peer, record: record("amy") }), "unchanged record");
    assert_eq!(channel.online_count(), 2);

    let mut moved = record("amy");
    moved.cursor_x = 50.0;
    assert!(channel.apply(PeerEvent::Upsert { connection: peer, record: moved }));
    assert_eq!(channel.peers()[&peer].cursor_x, 50.0);

    assert!(channel.apply(PeerEvent::Left { connection: peer }));
    assert!(!channel.apply(PeerEvent::Left { connection: peer }));
    assert!(channel.peers().is_empty());
}

#[test]
fn own_connection_is_never_a_peer() {
    let (mut channel, transport, _clock) = joined(0);

    assert!(!channel.apply(PeerEvent::Upsert { connection: transport.connection, record: record("dana") }));
    assert!(!channel.apply(PeerEvent::Left { connection: transport.connection }));

    assert!(channel.peers().is_empty());
    assert!(channel.is_joined());
}

#[test]
fn peers_sorted_by_name_then_connection() {
    let (mut channel, _transport, _clock) = joined(0);
    let zed = Uuid::from_u128(1);
    let amy_b = Uuid::from_u128(3);
    let amy_a = Uuid::from_u128(2);
    channel.apply(PeerEvent::Upsert { connection: zed, record: record("zed") });
    channel.apply(PeerEvent::Upsert { connection: amy_b, record: record("amy") });
    channel.apply(PeerEvent::Upsert { connection: amy_a, record: record("amy") });

    let order: Vec<ConnectionId> = channel.peers_sorted().into_iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec![amy_a, amy_b, zed]);
}

// =============================================================
// Leave
// =============================================================

#[test]
fn leave_stops_publishing_and_delivery() {
    let (mut channel, transport, _clock) = joined(0);
    channel.apply(PeerEvent::Upsert { connection: Uuid::new_v4(), record: record("amy") });

    channel.leave();
    channel.leave();

    assert_eq!(transport.left.borrow().len(), 1);
    assert!(!channel.is_joined());
    assert!(channel.peers().is_empty());
    assert!(!channel.publish_cursor(Point::new(1.0, 1.0)));
    assert!(!channel.apply(PeerEvent::Upsert { connection: Uuid::new_v4(), record: record("bob") }));
    assert!(transport.published.borrow().is_empty());
}

#[test]
fn drop_leaves_the_room() {
    let (channel, transport, _clock) = joined(0);
    drop(channel);
    assert_eq!(transport.left.borrow().as_slice(), &[transport.connection]);
}
