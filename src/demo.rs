//! Headless two-client session against the in-process hub.
//!
//! DESIGN
//! ======
//! Each simulated client is a mounted [`BoardSession`] whose inbound pump and
//! outbox forwarder run as local tasks, exactly as a browser host would run
//! them. The script drives the engines through their input handlers and
//! honors the returned actions (deferred ticks, editor open/close) the way a
//! host does. Between steps the demo yields so pumps and forwarders catch up,
//! then checks that each client converged on the other's writes.
//!
//! [`run`] spawns with `tokio::task::spawn_local` and must be called inside a
//! `LocalSet`.

#[cfg(test)]
#[path = "demo_test.rs"]
mod demo_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use canvas::camera::Point;
use canvas::doc::{BoardId, Note, NoteColor, NoteId};
use canvas::engine::{Action, EngineCore};
use canvas::input::{Button, Key, Modifiers};
use canvas::presence::Identity;
use canvas::session::{self, BoardSession};
use canvas::sync::{Clock, SyncContext, SystemClock};
use tracing::{debug, info};

use crate::config::DemoConfig;
use crate::hub::MemoryHub;

const VIEWPORT: (f64, f64) = (1280.0, 800.0);
const SETTLE_YIELDS: usize = 32;
const DRAG_DELTA: Point = Point { x: 120.0, y: 60.0 };

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("{client} never saw {what}")]
    NotReplicated { client: &'static str, what: &'static str },
    #[error("{client}: {what}")]
    Unexpected { client: &'static str, what: &'static str },
    #[error("board vanished from the hub")]
    MissingBoard,
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What the demo ended with.
#[derive(Debug)]
pub struct DemoSummary {
    pub board_id: BoardId,
    /// Notes on the hub after both clients unmounted.
    pub notes: Vec<Note>,
    /// Peer names alice saw while bob was online.
    pub peers_seen_by_alice: Vec<String>,
    /// Pointer moves in bob's drag.
    pub drag_steps: u32,
    pub snapshot_json: String,
}

// =============================================================================
// SIMULATED CLIENT
// =============================================================================

struct SimClient {
    name: &'static str,
    session: BoardSession,
    core: Rc<RefCell<EngineCore>>,
    /// Repaints requested by remote data.
    repaints: Rc<Cell<usize>>,
}

impl SimClient {
    fn mount(ctx: &SyncContext, board_id: BoardId, name: &'static str, config: &DemoConfig) -> Self {
        let identity = Identity { user_id: format!("user-{name}"), email: Some(format!("{name}@example.com")) };
        let repaints = Rc::new(Cell::new(0));
        let counter = Rc::clone(&repaints);
        let notify = move |actions: Vec<Action>| {
            for action in actions {
                match action {
                    Action::RenderNeeded => counter.set(counter.get() + 1),
                    Action::EndTextEdit { id } => debug!(client = name, %id, "editor closed by remote change"),
                    other => debug!(client = name, ?other, "remote action"),
                }
            }
        };

        let (session, tasks) = session::mount(ctx, board_id, &identity, config.canvas, notify);
        tokio::task::spawn_local(tasks.inbound);
        tokio::task::spawn_local(tasks.forwarder);

        let core = session.core();
        core.borrow_mut().set_viewport(VIEWPORT.0, VIEWPORT.1, 1.0);
        Self { name, session, core, repaints }
    }

    fn note(&self, id: &NoteId) -> Option<Note> {
        self.core.borrow().note(id).cloned()
    }

    /// Screen position of a point inside the note, in this client's view.
    fn screen_of(&self, id: &NoteId) -> Result<Point, DemoError> {
        let core = self.core.borrow();
        let note = core.note(id).ok_or(DemoError::NotReplicated { client: self.name, what: "the note" })?;
        Ok(core.camera.world_to_screen(Point::new(note.x + 10.0, note.y + 10.0)))
    }

    /// Click (press and release without moving) at a screen point.
    fn click(&self, screen: Point) {
        let mut core = self.core.borrow_mut();
        core.on_pointer_down(screen, Button::Primary, Modifiers::default());
        core.on_pointer_up(screen, Button::Primary, Modifiers::default());
    }

    /// Double-click background, wait for the deferred tick, type, and commit.
    async fn create_note(&self, screen: Point, text: &str) -> Result<NoteId, DemoError> {
        let actions = self.core.borrow_mut().on_double_click(screen);
        let delay = actions
            .iter()
            .find_map(|a| match a {
                Action::ScheduleTick { delay_ms } => Some(*delay_ms),
                _ => None,
            })
            .ok_or(DemoError::Unexpected { client: self.name, what: "double-click scheduled no tick" })?;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let actions = self.core.borrow_mut().on_tick();
        let id = actions
            .iter()
            .find_map(|a| match a {
                Action::BeginTextEdit { id, .. } => Some(*id),
                _ => None,
            })
            .ok_or(DemoError::Unexpected { client: self.name, what: "editor never opened" })?;

        let mut core = self.core.borrow_mut();
        core.set_edit_buffer(text);
        core.on_key_down(&Key::new("Escape"), Modifiers::default());
        info!(client = self.name, %id, "note created");
        Ok(id)
    }

    /// Drag the note by `delta` screen pixels in `steps` pointer moves.
    fn drag(&self, id: &NoteId, delta: Point, steps: u32) -> Result<(), DemoError> {
        let start = self.screen_of(id)?;
        let steps = steps.max(1);
        let mut core = self.core.borrow_mut();
        core.on_pointer_down(start, Button::Primary, Modifiers::default());
        for step in 1..=steps {
            let t = f64::from(step) / f64::from(steps);
            let at = Point::new(start.x + delta.x * t, start.y + delta.y * t);
            core.on_pointer_move(at, Modifiers::default());
        }
        let end = Point::new(start.x + delta.x, start.y + delta.y);
        core.on_pointer_up(end, Button::Primary, Modifiers::default());
        Ok(())
    }

    fn peer_names(&self) -> Vec<String> {
        let core = self.core.borrow();
        core.presence
            .as_ref()
            .map(|p| p.peers_sorted().into_iter().map(|(_, record)| record.name.clone()).collect())
            .unwrap_or_default()
    }
}

/// Give pumps and forwarders a chance to run.
async fn settle() {
    for _ in 0..SETTLE_YIELDS {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// SCRIPT
// =============================================================================

/// Run the two-client script.
///
/// # Errors
///
/// Returns the first convergence check that failed.
pub async fn run(config: DemoConfig) -> Result<DemoSummary, DemoError> {
    let hub = MemoryHub::new();
    let clock = Rc::new(SystemClock);
    let board = hub.create_board(&config.board_name, Some("user-alice".to_owned()), clock.now_ms());
    info!(board_id = %board.id, name = %board.name, "demo board ready");

    let ctx = SyncContext { data: Rc::new(hub.clone()), presence: Rc::new(hub.clone()), clock };
    let alice = SimClient::mount(&ctx, board.id, "alice", &config);
    let bob = SimClient::mount(&ctx, board.id, "bob", &config);
    settle().await;

    // Alice creates and names a note.
    let id = alice.create_note(Point::new(200.0, 200.0), "Ship the demo").await?;
    settle().await;
    let seen = bob.note(&id).ok_or(DemoError::NotReplicated { client: "bob", what: "alice's note" })?;
    if seen.content != "Ship the demo" {
        return Err(DemoError::NotReplicated { client: "bob", what: "alice's text" });
    }

    // Bob zooms in and drags it; every move is its own write.
    bob.core.borrow_mut().zoom_in();
    let zoom = bob.core.borrow().camera.zoom;
    let before = seen.position();
    bob.drag(&id, DRAG_DELTA, config.drag_steps)?;
    settle().await;

    let expected = Point::new(before.x + DRAG_DELTA.x / zoom, before.y + DRAG_DELTA.y / zoom);
    let moved = alice.note(&id).ok_or(DemoError::NotReplicated { client: "alice", what: "the note after the drag" })?;
    if (moved.x - expected.x).abs() > 1e-6 || (moved.y - expected.y).abs() > 1e-6 {
        return Err(DemoError::NotReplicated { client: "alice", what: "bob's drag" });
    }
    let peers_seen_by_alice = alice.peer_names();
    if !peers_seen_by_alice.iter().any(|name| name == "bob") {
        return Err(DemoError::NotReplicated { client: "alice", what: "bob's cursor" });
    }

    // Alice recolors the moved note.
    alice.click(alice.screen_of(&id)?);
    alice.core.borrow_mut().set_selected_color(NoteColor::Blue);
    settle().await;
    if bob.note(&id).map(|n| n.color) != Some(NoteColor::Blue) {
        return Err(DemoError::NotReplicated { client: "bob", what: "the new color" });
    }

    // Bob creates a scratch note and deletes it before its editor opens.
    let actions = bob.core.borrow_mut().on_double_click(Point::new(900.0, 600.0));
    let scratch = bob.core.borrow().selection().ok_or(DemoError::Unexpected { client: "bob", what: "no selection" })?;
    debug!(client = "bob", ?actions, %scratch, "scratch note created");
    bob.core.borrow_mut().on_key_down(&Key::new("Delete"), Modifiers::default());
    if !bob.core.borrow_mut().on_tick().is_empty() {
        return Err(DemoError::Unexpected { client: "bob", what: "editor opened on a deleted note" });
    }
    settle().await;
    if alice.note(&scratch).is_some() {
        return Err(DemoError::NotReplicated { client: "alice", what: "bob's delete" });
    }

    info!(
        alice_repaints = alice.repaints.get(),
        bob_repaints = bob.repaints.get(),
        bob_mounted = bob.session.is_mounted(),
        "script finished"
    );
    drop(alice);
    drop(bob);
    settle().await;

    let snapshot = hub.snapshot(&board.id).ok_or(DemoError::MissingBoard)?;
    let snapshot_json = serde_json::to_string_pretty(&snapshot)?;
    info!(notes = snapshot.notes.len(), snapshot = %snapshot_json, "final board state");

    Ok(DemoSummary {
        board_id: board.id,
        notes: snapshot.notes,
        peers_seen_by_alice,
        drag_steps: config.drag_steps,
        snapshot_json,
    })
}
