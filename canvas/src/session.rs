//! Mounting a board: one engine plus the futures that keep it in sync.
//!
//! [`mount`] builds the store, joins the presence room, opens the board
//! subscription and returns two futures for the host to spawn on its local
//! executor:
//!
//! - `inbound` feeds subscription pushes and peer events into the engine and
//!   hands the resulting [`Action`]s to the host's `notify` callback. It is
//!   abortable; [`BoardSession::unmount`] stops it.
//! - `forwarder` drains the outbox into the sync service. It is not aborted on
//!   unmount: it finishes once the engine (and with it the last outbox sender)
//!   is dropped, so writes already queued still go out.
//!
//! The engine is shared as `Rc<RefCell<EngineCore>>`. Borrows are taken per
//! event and released before the next `.await`.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable, LocalBoxFuture, abortable};
use futures::{FutureExt, StreamExt, stream};
use tracing::{debug, info, warn};

use crate::config::CanvasConfig;
use crate::doc::{BoardId, DocStore};
use crate::engine::{Action, EngineCore};
use crate::outbox::{self, forward_mutations};
use crate::presence::{Identity, PresenceChannel};
use crate::sync::{BoardQuery, PeerEvent, QueryState, SyncContext};

/// A mounted board.
pub struct BoardSession {
    board_id: BoardId,
    core: Rc<RefCell<EngineCore>>,
    inbound: AbortHandle,
    mounted: bool,
}

/// Futures the host must spawn for a mounted board.
pub struct SessionTasks {
    /// Subscription and presence pump. Resolves to `Err(Aborted)` after unmount.
    pub inbound: Abortable<LocalBoxFuture<'static, ()>>,
    /// Outbox forwarder.
    pub forwarder: LocalBoxFuture<'static, ()>,
}

enum Inbound {
    Query(QueryState),
    Peer(PeerEvent),
}

/// Mount `board_id` for `identity`.
///
/// `notify` receives the actions produced by remote data (repaints, editor
/// closes); it runs outside any engine borrow, so it may call back into the
/// engine.
pub fn mount<F>(
    ctx: &SyncContext,
    board_id: BoardId,
    identity: &Identity,
    config: CanvasConfig,
    notify: F,
) -> (BoardSession, SessionTasks)
where
    F: FnMut(Vec<Action>) + 'static,
{
    let (outbox, outbox_rx) = outbox::channel();
    let doc = DocStore::new(board_id, Some(identity.user_id.clone()), Rc::clone(&ctx.clock), outbox);
    let mut core = EngineCore::new(doc, config);

    let (presence, peer_events) = PresenceChannel::join(
        Rc::clone(&ctx.presence),
        Rc::clone(&ctx.clock),
        board_id,
        identity,
        config.cursor_publish_interval_ms,
    );
    core.attach_presence(presence);
    let core = Rc::new(RefCell::new(core));

    let queries = ctx.data.subscribe(&BoardQuery::new(board_id));
    let events = stream::select(queries.map(Inbound::Query), peer_events.map(Inbound::Peer));
    let pump = pump_inbound(Rc::clone(&core), events, notify).boxed_local();
    let (inbound, handle) = abortable(pump);

    let forwarder = forward_mutations(Rc::clone(&ctx.data), outbox_rx, config.coalesce_updates).boxed_local();

    info!(%board_id, user = %identity.user_id, "board mounted");
    let session = BoardSession { board_id, core, inbound: handle, mounted: true };
    (session, SessionTasks { inbound, forwarder })
}

async fn pump_inbound<S, F>(core: Rc<RefCell<EngineCore>>, mut events: S, mut notify: F)
where
    S: stream::Stream<Item = Inbound> + Unpin,
    F: FnMut(Vec<Action>),
{
    while let Some(event) = events.next().await {
        let actions = {
            let mut core = core.borrow_mut();
            match event {
                Inbound::Query(state) => core.apply_query(state),
                Inbound::Peer(event) => core.apply_peer_event(event),
            }
        };
        if !actions.is_empty() {
            notify(actions);
        }
    }
    debug!("inbound streams ended");
}

impl BoardSession {
    #[must_use]
    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// Shared handle to the engine, for the host's input wiring and [`crate::engine::Engine`].
    #[must_use]
    pub fn core(&self) -> Rc<RefCell<EngineCore>> {
        Rc::clone(&self.core)
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Stop the subscription pump and leave the presence room. Queued writes still go out.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.inbound.abort();
        match self.core.try_borrow_mut() {
            Ok(mut core) => core.unmount(),
            // The presence channel still leaves when the last engine handle drops.
            Err(err) => warn!(board_id = %self.board_id, error = %err, "engine busy during unmount; room left later"),
        }
        info!(board_id = %self.board_id, "board unmounted");
    }
}

impl Drop for BoardSession {
    fn drop(&mut self) {
        self.unmount();
    }
}
