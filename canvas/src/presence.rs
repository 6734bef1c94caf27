//! Presence channel: live cursors for everyone viewing a board.
//!
//! DESIGN
//! ======
//! Presence is ephemeral. Each client joins the board's room with its name,
//! color and cursor, republishes the cursor on every pointer move, and keeps
//! the latest record per peer connection. Nothing here is persisted or merged
//! into the note store.
//!
//! Cursor positions are canvas-local screen coordinates, not world
//! coordinates: a peer's cursor is drawn where the peer's pointer sits on
//! their own screen, independent of either viewport.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashMap;
use std::rc::Rc;

use futures::stream::LocalBoxStream;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::camera::Point;
use crate::color::cursor_color;
use crate::consts::ANONYMOUS_NAME;
use crate::doc::{BoardId, UserId};
use crate::sync::{Clock, ConnectionId, PeerEvent, PresenceTransport, RoomId};

/// The signed-in user, as supplied by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl Identity {
    /// Local part of the email, or `"Anonymous"` when there is none.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or(ANONYMOUS_NAME)
            .to_owned()
    }
}

/// What one connection shares with the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub name: String,
    /// CSS hex color from [`cursor_color`].
    pub color: String,
    /// Cursor x in canvas-local screen pixels.
    pub cursor_x: f64,
    /// Cursor y in canvas-local screen pixels.
    pub cursor_y: f64,
}

impl PresenceRecord {
    /// Initial record for `identity`: derived name and color, cursor at the origin.
    #[must_use]
    pub fn initial(identity: &Identity) -> Self {
        Self {
            name: identity.display_name(),
            color: cursor_color(&identity.user_id).to_owned(),
            cursor_x: 0.0,
            cursor_y: 0.0,
        }
    }

    /// First character of the name, uppercased, for avatars.
    #[must_use]
    pub fn initial_letter(&self) -> Option<char> {
        self.name.chars().next().map(|c| c.to_uppercase().next().unwrap_or(c))
    }
}

/// Partial presence update. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_y: Option<f64>,
}

impl PresencePatch {
    #[must_use]
    pub fn cursor(screen: Point) -> Self {
        Self { cursor_x: Some(screen.x), cursor_y: Some(screen.y), ..Self::default() }
    }

    pub fn apply_to(&self, record: &mut PresenceRecord) {
        if let Some(name) = &self.name {
            record.name.clone_from(name);
        }
        if let Some(color) = &self.color {
            record.color.clone_from(color);
        }
        if let Some(x) = self.cursor_x {
            record.cursor_x = x;
        }
        if let Some(y) = self.cursor_y {
            record.cursor_y = y;
        }
    }
}

/// This client's membership in a board's presence room.
pub struct PresenceChannel {
    room: RoomId,
    connection: ConnectionId,
    transport: Rc<dyn PresenceTransport>,
    clock: Rc<dyn Clock>,
    me: PresenceRecord,
    peers: HashMap<ConnectionId, PresenceRecord>,
    joined: bool,
    /// Minimum spacing between cursor publishes; 0 publishes every move.
    min_interval_ms: i64,
    last_publish_ms: Option<i64>,
    /// A cursor move was held back by the interval and not yet published.
    unpublished: bool,
}

impl PresenceChannel {
    /// Join the board's room and publish the initial record.
    ///
    /// Returns the channel and the peer event stream the host must feed back
    /// through [`apply`](Self::apply).
    pub fn join(
        transport: Rc<dyn PresenceTransport>,
        clock: Rc<dyn Clock>,
        board_id: BoardId,
        identity: &Identity,
        min_interval_ms: u64,
    ) -> (Self, LocalBoxStream<'static, PeerEvent>) {
        let room = RoomId::board(board_id);
        let me = PresenceRecord::initial(identity);
        let subscription = transport.join(&room, me.clone());
        info!(%board_id, connection = %subscription.connection, name = %me.name, "joined presence room");
        let channel = Self {
            room,
            connection: subscription.connection,
            transport,
            clock,
            me,
            peers: HashMap::new(),
            joined: true,
            min_interval_ms: i64::try_from(min_interval_ms).unwrap_or(i64::MAX),
            last_publish_ms: None,
            unpublished: false,
        };
        (channel, subscription.events)
    }

    /// Record and publish this client's cursor. Returns `true` if it went out now.
    pub fn publish_cursor(&mut self, screen: Point) -> bool {
        if !self.joined {
            return false;
        }
        self.me.cursor_x = screen.x;
        self.me.cursor_y = screen.y;

        let now = self.clock.now_ms();
        if let Some(last) = self.last_publish_ms {
            if now - last < self.min_interval_ms {
                self.unpublished = true;
                return false;
            }
        }
        self.send_cursor(now);
        true
    }

    /// Publish a cursor position that was held back by the interval, if any.
    pub fn flush(&mut self) -> bool {
        if !self.joined || !self.unpublished {
            return false;
        }
        let now = self.clock.now_ms();
        self.send_cursor(now);
        true
    }

    /// Milliseconds until a held-back cursor is due, if one is waiting.
    #[must_use]
    pub fn held_back_ms(&self) -> Option<u64> {
        if !self.joined || !self.unpublished {
            return None;
        }
        let due = self.last_publish_ms.map_or(0, |last| last.saturating_add(self.min_interval_ms));
        let remaining = due.saturating_sub(self.clock.now_ms()).max(0);
        Some(u64::try_from(remaining).unwrap_or(0))
    }

    fn send_cursor(&mut self, now: i64) {
        let patch = PresencePatch { cursor_x: Some(self.me.cursor_x), cursor_y: Some(self.me.cursor_y), ..PresencePatch::default() };
        self.transport.publish(&self.room, self.connection, patch);
        self.last_publish_ms = Some(now);
        self.unpublished = false;
    }

    /// Fold a peer event into the peer map. Returns `true` if the peer set changed.
    ///
    /// Events about this client's own connection are ignored.
    pub fn apply(&mut self, event: PeerEvent) -> bool {
        if !self.joined {
            return false;
        }
        match event {
            PeerEvent::Upsert { connection, .. } | PeerEvent::Left { connection } if connection == self.connection => {
                false
            }
            PeerEvent::Upsert { connection, record } => {
                if self.peers.get(&connection) == Some(&record) {
                    return false;
                }
                self.peers.insert(connection, record);
                true
            }
            PeerEvent::Left { connection } => {
                let removed = self.peers.remove(&connection).is_some();
                if removed {
                    debug!(%connection, "peer left");
                }
                removed
            }
        }
    }

    /// Leave the room. Further publishes and events are ignored.
    pub fn leave(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;
        self.peers.clear();
        self.transport.leave(&self.room, self.connection);
        info!(board_id = %self.room.id, connection = %self.connection, "left presence room");
    }

    // --- Queries ---

    /// This client's own latest record.
    #[must_use]
    pub fn me(&self) -> &PresenceRecord {
        &self.me
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Remote connections and their latest records. Never contains this client.
    #[must_use]
    pub fn peers(&self) -> &HashMap<ConnectionId, PresenceRecord> {
        &self.peers
    }

    /// Peers in a stable order (name, then connection id) for rendering.
    #[must_use]
    pub fn peers_sorted(&self) -> Vec<(ConnectionId, &PresenceRecord)> {
        let mut peers: Vec<(ConnectionId, &PresenceRecord)> = self.peers.iter().map(|(id, rec)| (*id, rec)).collect();
        peers.sort_by(|a, b| a.1.name.cmp(&b.1.name).then_with(|| a.0.cmp(&b.0)));
        peers
    }

    /// Peers plus this client.
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.peers.len() + 1
    }
}

impl Drop for PresenceChannel {
    fn drop(&mut self) {
        self.leave();
    }
}
