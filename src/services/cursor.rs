//! Presence service: ephemeral per-room records and fan-out.
//!
//! DESIGN
//! ======
//! Presence records are never persisted. Joining a room assigns a fresh
//! connection id, replays the current members to the newcomer, and announces
//! the newcomer to everyone else. Publishes merge into the sender's record and
//! are broadcast to every other member; the sender never hears its own
//! updates. A member whose event receiver is gone is stale: it is removed and
//! announced as `Left` the next time the room fans out.

#[cfg(test)]
#[path = "cursor_test.rs"]
mod cursor_test;

use canvas::presence::{PresencePatch, PresenceRecord};
use canvas::sync::{ConnectionId, PeerEvent, RoomId, RoomSubscription};
use futures::channel::mpsc;
use futures::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::{HubState, Member, RoomState};

/// Add a connection to `room`.
pub fn join(state: &mut HubState, room: RoomId, initial: PresenceRecord) -> RoomSubscription {
    let connection = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded();
    let members = &mut state.rooms.entry(room).or_default().members;

    for (peer, member) in members.iter() {
        if tx.unbounded_send(PeerEvent::Upsert { connection: *peer, record: member.record.clone() }).is_err() {
            break;
        }
    }
    members.insert(connection, Member { record: initial.clone(), events: tx });
    info!(room = %room.id, %connection, name = %initial.name, members = members.len(), "joined room");

    broadcast(state, room, &PeerEvent::Upsert { connection, record: initial }, Some(connection));
    RoomSubscription { connection, events: rx.boxed_local() }
}

/// Merge `patch` into a member's record and tell the other members.
/// Returns `false` if the connection is not in the room.
pub fn publish(state: &mut HubState, room: RoomId, connection: ConnectionId, patch: &PresencePatch) -> bool {
    let Some(member) = state.rooms.get_mut(&room).and_then(|r| r.members.get_mut(&connection)) else {
        debug!(room = %room.id, %connection, "publish from non-member ignored");
        return false;
    };
    patch.apply_to(&mut member.record);
    let record = member.record.clone();
    broadcast(state, room, &PeerEvent::Upsert { connection, record }, Some(connection));
    true
}

/// Remove a member and announce its departure. Empty rooms are dropped.
pub fn leave(state: &mut HubState, room: RoomId, connection: ConnectionId) {
    let Some(room_state) = state.rooms.get_mut(&room) else {
        return;
    };
    if room_state.members.remove(&connection).is_none() {
        return;
    }
    info!(room = %room.id, %connection, remaining = room_state.members.len(), "left room");
    broadcast(state, room, &PeerEvent::Left { connection }, None);
}

/// Live members of a room.
#[must_use]
pub fn members(state: &HubState, room: &RoomId) -> Vec<(ConnectionId, PresenceRecord)> {
    state
        .rooms
        .get(room)
        .map(|r| r.members.iter().map(|(id, m)| (*id, m.record.clone())).collect())
        .unwrap_or_default()
}

/// Send `event` to every member except `exclude`, pruning stale members as they are found.
fn broadcast(state: &mut HubState, room: RoomId, event: &PeerEvent, exclude: Option<ConnectionId>) {
    let mut pending = vec![(event.clone(), exclude)];
    while let Some((event, exclude)) = pending.pop() {
        let Some(room_state) = state.rooms.get_mut(&room) else {
            return;
        };
        for stale in send_all(room_state, &event, exclude) {
            debug!(room = %room.id, connection = %stale, "pruned stale connection");
            pending.push((PeerEvent::Left { connection: stale }, None));
        }
        if room_state.members.is_empty() {
            state.rooms.remove(&room);
            debug!(room = %room.id, "room emptied");
            return;
        }
    }
}

fn send_all(room_state: &mut RoomState, event: &PeerEvent, exclude: Option<ConnectionId>) -> Vec<ConnectionId> {
    let stale: Vec<ConnectionId> = room_state
        .members
        .iter()
        .filter(|(id, _)| exclude != Some(**id))
        .filter(|(_, member)| member.events.unbounded_send(event.clone()).is_err())
        .map(|(id, _)| *id)
        .collect();
    for id in &stale {
        room_state.members.remove(id);
    }
    stale
}
