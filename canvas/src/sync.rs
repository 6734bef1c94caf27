//! Interfaces of the external sync collaborator.
//!
//! DESIGN
//! ======
//! The engine never reaches for a global client handle. Everything it needs
//! from the outside world (board subscription, mutation submission, the
//! presence room, and wall-clock time) arrives through a [`SyncContext`]
//! built by the host, so tests and the in-process hub can stand in for the
//! real service.
//!
//! All futures and streams here are `!Send`: the engine runs on a single UI
//! event loop.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use futures::stream::LocalBoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::BOARD_ROOM;
use crate::doc::{BoardId, BoardSnapshot, Note, NoteId, NotePatch};
use crate::error::SyncError;
use crate::presence::{PresencePatch, PresenceRecord};

// =============================================================================
// DATA
// =============================================================================

/// Selects one board with its nested notes and shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardQuery {
    pub board_id: BoardId,
}

impl BoardQuery {
    #[must_use]
    pub fn new(board_id: BoardId) -> Self {
        Self { board_id }
    }
}

/// One push from the board subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    /// The service has not produced data yet.
    Loading,
    /// The subscription failed; the service reconnects on its own.
    Failed(String),
    /// Fresh authoritative data. `None` when the board does not exist.
    Ready(Option<BoardSnapshot>),
}

/// A write submitted to the sync service, keyed by note id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Mutation {
    /// Full record, including board linkage and creator.
    CreateNote(Note),
    UpdateNote { id: NoteId, patch: NotePatch },
    DeleteNote { id: NoteId },
}

impl Mutation {
    #[must_use]
    pub fn note_id(&self) -> NoteId {
        match self {
            Self::CreateNote(note) => note.id,
            Self::UpdateNote { id, .. } | Self::DeleteNote { id } => *id,
        }
    }
}

#[async_trait(?Send)]
pub trait SyncService {
    /// Open a long-lived subscription. Dropping the stream cancels it.
    fn subscribe(&self, query: &BoardQuery) -> LocalBoxStream<'static, QueryState>;

    /// Submit mutations. The service arbitrates conflicts by `updated_at`.
    async fn transact(&self, mutations: Vec<Mutation>) -> Result<(), SyncError>;
}

// =============================================================================
// PRESENCE
// =============================================================================

/// Identifies one live connection inside a presence room.
pub type ConnectionId = Uuid;

/// A presence scope: room type plus id. Boards use `("board", board_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId {
    pub kind: &'static str,
    pub id: Uuid,
}

impl RoomId {
    #[must_use]
    pub fn board(board_id: BoardId) -> Self {
        Self { kind: BOARD_ROOM, id: board_id }
    }
}

/// Change to the room as seen by one connection.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A peer joined or changed its record; carries the full latest record.
    Upsert { connection: ConnectionId, record: PresenceRecord },
    /// A peer left or its connection went stale.
    Left { connection: ConnectionId },
}

/// Result of joining a room.
pub struct RoomSubscription {
    pub connection: ConnectionId,
    pub events: LocalBoxStream<'static, PeerEvent>,
}

pub trait PresenceTransport {
    /// Join `room` with an initial record. Peers learn about the new connection
    /// through their own event streams.
    fn join(&self, room: &RoomId, initial: PresenceRecord) -> RoomSubscription;

    /// Merge `patch` into this connection's record and fan it out.
    fn publish(&self, room: &RoomId, connection: ConnectionId, patch: PresencePatch);

    fn leave(&self, room: &RoomId, connection: ConnectionId);
}

// =============================================================================
// CLOCK
// =============================================================================

/// Source of `created_at` / `updated_at` stamps, in milliseconds since the Unix epoch.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Wall clock: `Date.now()` in the browser, the system clock elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> i64 {
        (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Hand-driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_ms: i64) -> Self {
        Self { now: Cell::new(start_ms) }
    }

    pub fn set(&self, ms: i64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Services injected into a board session.
#[derive(Clone)]
pub struct SyncContext {
    pub data: Rc<dyn SyncService>,
    pub presence: Rc<dyn PresenceTransport>,
    pub clock: Rc<dyn Clock>,
}
