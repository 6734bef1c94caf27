//! Fakes and builders shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::LocalBoxStream;
use futures::StreamExt;
use uuid::Uuid;

use crate::doc::{Board, BoardId, BoardSnapshot, DocStore, Note, NoteColor};
use crate::error::SyncError;
use crate::outbox::{self, OutboxReceiver};
use crate::presence::{Identity, PresencePatch, PresenceRecord};
use crate::sync::{
    BoardQuery, ConnectionId, ManualClock, Mutation, PeerEvent, PresenceTransport, QueryState, RoomId,
    RoomSubscription, SyncService,
};

pub const T0: i64 = 1_700_000_000_000;

// =============================================================================
// BUILDERS
// =============================================================================

pub fn clock() -> Rc<ManualClock> {
    Rc::new(ManualClock::new(T0))
}

pub fn identity(user_id: &str, email: Option<&str>) -> Identity {
    Identity { user_id: user_id.to_owned(), email: email.map(str::to_owned) }
}

/// Store for a fresh board plus the outbox receiver it feeds.
pub fn store(clock: Rc<ManualClock>) -> (DocStore, OutboxReceiver) {
    let (outbox, rx) = outbox::channel();
    (DocStore::new(Uuid::new_v4(), Some("user-1".to_owned()), clock, outbox), rx)
}

pub fn board(id: BoardId) -> Board {
    Board { id, name: "Retro".to_owned(), created_at: T0, creator: Some("user-1".to_owned()) }
}

pub fn note(board_id: BoardId, x: f64, y: f64, w: f64, h: f64) -> Note {
    Note {
        id: Uuid::new_v4(),
        board_id,
        content: "hello".to_owned(),
        x,
        y,
        width: w,
        height: h,
        color: NoteColor::Yellow,
        created_at: T0,
        updated_at: T0,
        created_by: None,
    }
}

pub fn snapshot(board_id: BoardId, notes: Vec<Note>) -> BoardSnapshot {
    BoardSnapshot { board: board(board_id), notes, shapes: Vec::new() }
}

/// Everything queued on the outbox so far.
pub fn drain(rx: &mut OutboxReceiver) -> Vec<Mutation> {
    let mut out = Vec::new();
    while let Ok(Some(pending)) = rx.try_next() {
        out.push(pending.mutation);
    }
    out
}

/// Drain the outbox and answer every entry as the service would.
pub fn settle_all(rx: &mut OutboxReceiver, result: &Result<(), SyncError>) -> Vec<Mutation> {
    let mut out = Vec::new();
    while let Ok(Some(pending)) = rx.try_next() {
        out.push(pending.mutation.clone());
        pending.settle(result);
    }
    out
}

// =============================================================================
// FAKE SYNC SERVICE
// =============================================================================

/// Records submitted mutations and lets the test push subscription states.
#[derive(Default)]
pub struct RecordingSync {
    pub transacted: RefCell<Vec<Mutation>>,
    pub queries: RefCell<Vec<BoardQuery>>,
    fail_next: RefCell<Option<SyncError>>,
    subscribers: RefCell<Vec<mpsc::UnboundedSender<QueryState>>>,
}

impl RecordingSync {
    pub fn fail_next(&self, err: SyncError) {
        *self.fail_next.borrow_mut() = Some(err);
    }

    /// Deliver a state to every open subscription. Returns how many received it.
    pub fn push(&self, state: QueryState) -> usize {
        let mut subs = self.subscribers.borrow_mut();
        subs.retain(|tx| tx.unbounded_send(state.clone()).is_ok());
        subs.len()
    }
}

#[async_trait(?Send)]
impl SyncService for RecordingSync {
    fn subscribe(&self, query: &BoardQuery) -> LocalBoxStream<'static, QueryState> {
        self.queries.borrow_mut().push(*query);
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.borrow_mut().push(tx);
        rx.boxed_local()
    }

    async fn transact(&self, mutations: Vec<Mutation>) -> Result<(), SyncError> {
        if let Some(err) = self.fail_next.borrow_mut().take() {
            return Err(err);
        }
        self.transacted.borrow_mut().extend(mutations);
        Ok(())
    }
}

// =============================================================================
// FAKE PRESENCE TRANSPORT
// =============================================================================

/// Records joins, publishes and leaves; the test injects peer events.
pub struct RecordingPresence {
    pub connection: ConnectionId,
    pub joined: RefCell<Vec<(RoomId, PresenceRecord)>>,
    pub published: RefCell<Vec<PresencePatch>>,
    pub left: RefCell<Vec<ConnectionId>>,
    events: RefCell<Option<mpsc::UnboundedSender<PeerEvent>>>,
}

impl Default for RecordingPresence {
    fn default() -> Self {
        Self {
            connection: Uuid::new_v4(),
            joined: RefCell::new(Vec::new()),
            published: RefCell::new(Vec::new()),
            left: RefCell::new(Vec::new()),
            events: RefCell::new(None),
        }
    }
}

impl RecordingPresence {
    /// Deliver a peer event to the joined client. Returns `false` if nobody listens.
    pub fn emit(&self, event: PeerEvent) -> bool {
        match self.events.borrow().as_ref() {
            Some(tx) => tx.unbounded_send(event).is_ok(),
            None => false,
        }
    }
}

impl PresenceTransport for RecordingPresence {
    fn join(&self, room: &RoomId, initial: PresenceRecord) -> RoomSubscription {
        self.joined.borrow_mut().push((*room, initial));
        let (tx, rx) = mpsc::unbounded();
        *self.events.borrow_mut() = Some(tx);
        RoomSubscription { connection: self.connection, events: rx.boxed_local() }
    }

    fn publish(&self, _room: &RoomId, _connection: ConnectionId, patch: PresencePatch) {
        self.published.borrow_mut().push(patch);
    }

    fn leave(&self, _room: &RoomId, connection: ConnectionId) {
        self.left.borrow_mut().push(connection);
        *self.events.borrow_mut() = None;
    }
}
