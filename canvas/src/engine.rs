//! Interaction engine: turns pointer and keyboard input into camera moves and
//! note mutations.
//!
//! `EngineCore` holds everything that does not need a browser (store, camera,
//! selection, gesture state, presence) so it can be driven from tests. Each
//! handler returns the [`Action`]s the host must carry out; the core never
//! touches the DOM. `Engine` adds the canvas element and painting.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::{Camera, Point};
use crate::config::CanvasConfig;
use crate::doc::{DocStore, Note, NoteColor, NoteDraft, NoteId, NotePatch};
use crate::error::ErrorCode;
use crate::hit::hit_test;
use crate::input::{Button, InputState, Key, Modifiers, UiState, WheelDelta};
use crate::presence::PresenceChannel;
use crate::render;
use crate::sync::{PeerEvent, QueryState};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

const CURSOR_DEFAULT: &str = "default";
const CURSOR_PANNING: &str = "grabbing";
const CURSOR_DRAGGING: &str = "move";

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Something visible changed; repaint on the next frame.
    RenderNeeded,
    /// Open the text editor over a note, focused with all text selected.
    BeginTextEdit { id: NoteId, text: String },
    /// Close the text editor for a note.
    EndTextEdit { id: NoteId },
    /// Call [`EngineCore::on_tick`] after `delay_ms`.
    ScheduleTick { delay_ms: u64 },
    /// CSS cursor for the canvas element.
    SetCursor(String),
}

/// Core engine state: all logic that doesn't depend on the canvas element.
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub presence: Option<PresenceChannel>,
    pub config: CanvasConfig,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
}

impl EngineCore {
    #[must_use]
    pub fn new(doc: DocStore, config: CanvasConfig) -> Self {
        Self {
            doc,
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            presence: None,
            config,
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
        }
    }

    /// Attach the joined presence channel. Cursor moves are published through it from now on.
    pub fn attach_presence(&mut self, channel: PresenceChannel) {
        self.presence = Some(channel);
    }

    /// Leave the presence room. The store keeps its notes; queued writes still go out.
    pub fn unmount(&mut self) {
        if let Some(presence) = self.presence.as_mut() {
            presence.leave();
        }
        self.ui.pending_edit = None;
    }

    /// Update viewport dimensions (CSS pixels) and device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.viewport_width = width_css.max(0.0);
        self.viewport_height = height_css.max(0.0);
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    }

    // --- Pointer ---

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        self.ui.pending_edit = None;
        let world = self.camera.screen_to_world(screen);
        let mut actions = Vec::new();

        if let Some(id) = self.input.editing_id() {
            if self.doc.get(&id).is_some_and(|note| note.contains(world)) {
                return actions;
            }
            actions.extend(self.commit_edit());
        }
        self.finish_gesture();

        match hit_test(world, &self.doc).and_then(|id| self.doc.get(&id)).map(|n| (n.id, n.position())) {
            Some((id, position)) => {
                self.ui.selected_id = Some(id);
                self.input = InputState::DraggingNote { id, anchor: world - position };
                debug!(%id, "drag started");
                actions.push(Action::SetCursor(CURSOR_DRAGGING.to_owned()));
            }
            None => {
                self.ui.selected_id = None;
                self.camera.begin_pan(screen);
                self.input = InputState::Panning;
                debug!("pan started");
                actions.push(Action::SetCursor(CURSOR_PANNING.to_owned()));
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn on_pointer_move(&mut self, screen: Point, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = self.publish_cursor(screen);
        actions.extend(self.continue_gesture(screen));
        actions
    }

    fn continue_gesture(&mut self, screen: Point) -> Vec<Action> {
        match &self.input {
            InputState::Panning => {
                if self.camera.continue_pan(screen) {
                    return vec![Action::RenderNeeded];
                }
                Vec::new()
            }
            InputState::DraggingNote { id, anchor } => {
                let id = *id;
                let position = self.camera.screen_to_world(screen) - *anchor;
                match self.doc.update(&id, NotePatch::position(position)) {
                    Ok(()) => vec![Action::RenderNeeded],
                    Err(err) => {
                        debug!(%id, code = err.error_code(), "drag target gone; ending drag");
                        self.input = InputState::Idle;
                        vec![Action::SetCursor(CURSOR_DEFAULT.to_owned()), Action::RenderNeeded]
                    }
                }
            }
            InputState::Idle | InputState::EditingText { .. } => Vec::new(),
        }
    }

    pub fn on_pointer_up(&mut self, _screen: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        self.end_pointer_gesture()
    }

    /// The pointer left the canvas. Ends a pan or drag like a pointer-up.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        self.end_pointer_gesture()
    }

    /// Double-click on the selected note edits it; on an unselected note it
    /// only selects. On empty background it creates a note that enters
    /// editing after the configured delay.
    pub fn on_double_click(&mut self, screen: Point) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen);
        let mut actions = Vec::new();

        if let Some(id) = self.input.editing_id() {
            if self.doc.get(&id).is_some_and(|note| note.contains(world)) {
                return actions;
            }
            actions.extend(self.commit_edit());
        }
        self.finish_gesture();

        match hit_test(world, &self.doc) {
            Some(id) if self.ui.selected_id == Some(id) => actions.extend(self.begin_edit(id)),
            Some(id) => {
                debug!(%id, "double-click on unselected note selects it");
                self.ui.selected_id = Some(id);
                actions.push(Action::RenderNeeded);
            }
            None => {
                let id = self.doc.create(NoteDraft::at(world));
                self.ui.selected_id = Some(id);
                self.ui.pending_edit = Some(id);
                let delay = i64::try_from(self.config.edit_focus_delay_ms).unwrap_or(i64::MAX);
                self.ui.edit_due_ms = self.doc.now_ms().saturating_add(delay);
                actions.push(Action::RenderNeeded);
                actions.push(Action::ScheduleTick { delay_ms: self.config.edit_focus_delay_ms });
            }
        }
        actions
    }

    /// Deferred work: enter editing on a freshly created note and flush a held-back cursor.
    pub fn on_tick(&mut self) -> Vec<Action> {
        if let Some(presence) = self.presence.as_mut() {
            presence.flush();
        }
        let Some(id) = self.ui.pending_edit else {
            return Vec::new();
        };
        if self.doc.now_ms() < self.ui.edit_due_ms {
            // An early tick, e.g. for the cursor; the edit's own tick follows.
            return Vec::new();
        }
        self.ui.pending_edit = None;
        let still_wanted = self.doc.contains(&id) && self.ui.selected_id == Some(id) && self.input == InputState::Idle;
        if !still_wanted {
            debug!(%id, state = self.input.name(), "deferred edit dropped");
            return Vec::new();
        }
        self.begin_edit(id)
    }

    // --- Text editing ---

    /// Replace the uncommitted text. Returns `false` when no edit is open.
    pub fn set_edit_buffer(&mut self, text: impl Into<String>) -> bool {
        match &mut self.input {
            InputState::EditingText { buffer, .. } => {
                *buffer = text.into();
                true
            }
            _ => false,
        }
    }

    /// The host editor lost focus: commit.
    pub fn on_blur(&mut self) -> Vec<Action> {
        self.commit_edit()
    }

    // --- Keyboard ---

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if self.input.editing_id().is_some() {
            if key.is_escape() || (key.is_enter() && modifiers.command()) {
                return self.commit_edit();
            }
            return Vec::new();
        }
        if key.is_delete() {
            return self.delete_selected();
        }
        Vec::new()
    }

    // --- Toolbar ---

    pub fn on_wheel(&mut self, delta: WheelDelta) -> Vec<Action> {
        let before = self.camera.zoom;
        self.camera.zoom_by(-delta.dy * self.config.wheel_zoom_factor);
        if (self.camera.zoom - before).abs() > f64::EPSILON {
            vec![Action::RenderNeeded]
        } else {
            Vec::new()
        }
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.camera.zoom_in();
        vec![Action::RenderNeeded]
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.camera.zoom_out();
        vec![Action::RenderNeeded]
    }

    pub fn reset_view(&mut self) -> Vec<Action> {
        self.camera.reset();
        if self.input == InputState::Panning {
            self.input = InputState::Idle;
        }
        vec![Action::RenderNeeded]
    }

    /// Delete the selected note. Does nothing while editing or with no selection.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        if self.input.editing_id().is_some() {
            return Vec::new();
        }
        let Some(id) = self.ui.selected_id.take() else {
            return Vec::new();
        };
        if let Err(err) = self.doc.delete(&id) {
            warn!(%id, code = err.error_code(), error = %err, "delete of selected note failed");
        }
        self.ui.pending_edit = None;
        self.finish_gesture();
        vec![Action::SetCursor(CURSOR_DEFAULT.to_owned()), Action::RenderNeeded]
    }

    /// Recolor the selected note. Does nothing while editing or with no selection.
    pub fn set_selected_color(&mut self, color: NoteColor) -> Vec<Action> {
        if self.input.editing_id().is_some() {
            return Vec::new();
        }
        let Some(id) = self.ui.selected_id else {
            return Vec::new();
        };
        match self.doc.update(&id, NotePatch::color(color)) {
            Ok(()) => vec![Action::RenderNeeded],
            Err(err) => {
                warn!(%id, code = err.error_code(), error = %err, "recolor of selected note failed");
                Vec::new()
            }
        }
    }

    // --- Remote data ---

    /// Fold a subscription push into the store, then drop UI state that points at vanished notes.
    pub fn apply_query(&mut self, state: QueryState) -> Vec<Action> {
        self.doc.apply_query(state);
        let mut actions = Vec::new();

        if let Some(id) = self.input.note_id() {
            if !self.doc.contains(&id) {
                debug!(%id, state = self.input.name(), "note removed remotely; gesture cancelled");
                if self.input.editing_id().is_some() {
                    actions.push(Action::EndTextEdit { id });
                }
                self.input = InputState::Idle;
                actions.push(Action::SetCursor(CURSOR_DEFAULT.to_owned()));
            }
        }
        if self.ui.selected_id.is_some_and(|id| !self.doc.contains(&id)) {
            self.ui.selected_id = None;
        }
        if self.ui.pending_edit.is_some_and(|id| !self.doc.contains(&id)) {
            self.ui.pending_edit = None;
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Fold a presence event into the peer map.
    pub fn apply_peer_event(&mut self, event: PeerEvent) -> Vec<Action> {
        match self.presence.as_mut() {
            Some(presence) => {
                if presence.apply(event) {
                    vec![Action::RenderNeeded]
                } else {
                    Vec::new()
                }
            }
            None => Vec::new(),
        }
    }

    /// Publish the cursor; a move held back by the publish interval asks for a tick to flush it.
    fn publish_cursor(&mut self, screen: Point) -> Vec<Action> {
        let Some(presence) = self.presence.as_mut() else {
            return Vec::new();
        };
        let already_waiting = presence.held_back_ms().is_some();
        if presence.publish_cursor(screen) || already_waiting {
            return Vec::new();
        }
        match presence.held_back_ms() {
            Some(delay_ms) => vec![Action::ScheduleTick { delay_ms }],
            None => Vec::new(),
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn selection(&self) -> Option<NoteId> {
        self.ui.selected_id
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.doc.get(id)
    }

    // --- Internal ---

    fn begin_edit(&mut self, id: NoteId) -> Vec<Action> {
        let Some(text) = self.doc.get(&id).map(|note| note.content.clone()) else {
            return Vec::new();
        };
        self.ui.selected_id = Some(id);
        self.ui.pending_edit = None;
        self.input = InputState::EditingText { id, buffer: text.clone() };
        debug!(%id, "text edit started");
        vec![Action::BeginTextEdit { id, text }, Action::RenderNeeded]
    }

    fn commit_edit(&mut self) -> Vec<Action> {
        let (id, buffer) = match std::mem::take(&mut self.input) {
            InputState::EditingText { id, buffer } => (id, buffer),
            other => {
                self.input = other;
                return Vec::new();
            }
        };
        if let Err(err) = self.doc.update(&id, NotePatch::content(buffer)) {
            warn!(%id, code = err.error_code(), error = %err, "text commit failed");
        } else {
            debug!(%id, "text edit committed");
        }
        vec![Action::EndTextEdit { id }, Action::RenderNeeded]
    }

    fn end_pointer_gesture(&mut self) -> Vec<Action> {
        if let Some(presence) = self.presence.as_mut() {
            presence.flush();
        }
        match self.input {
            InputState::Panning | InputState::DraggingNote { .. } => {
                debug!(state = self.input.name(), "gesture ended");
                self.finish_gesture();
                vec![Action::SetCursor(CURSOR_DEFAULT.to_owned()), Action::RenderNeeded]
            }
            InputState::Idle | InputState::EditingText { .. } => Vec::new(),
        }
    }

    /// Drop a pan or drag without touching an open edit.
    fn finish_gesture(&mut self) {
        self.camera.end_pan();
        if matches!(self.input, InputState::Panning | InputState::DraggingNote { .. }) {
            self.input = InputState::Idle;
        }
    }
}

/// The full canvas engine: a shared `EngineCore` plus the browser canvas it paints.
pub struct Engine {
    canvas: HtmlCanvasElement,
    pub core: Rc<RefCell<EngineCore>>,
}

impl Engine {
    /// Bind a core (usually from [`crate::session::BoardSession::core`]) to a canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, core: Rc<RefCell<EngineCore>>) -> Self {
        Self { canvas, core }
    }

    /// Resize the backing store to `css × dpr` device pixels.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        let mut core = self.core.borrow_mut();
        core.set_viewport(width_css, height_css, dpr);
        self.canvas.set_width((core.viewport_width * core.dpr).round() as u32);
        self.canvas.set_height((core.viewport_height * core.dpr).round() as u32);
    }

    // --- Delegated input events ---

    pub fn on_pointer_down(&self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.borrow_mut().on_pointer_down(screen, button, modifiers)
    }

    pub fn on_pointer_move(&self, screen: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.borrow_mut().on_pointer_move(screen, modifiers)
    }

    pub fn on_pointer_up(&self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.borrow_mut().on_pointer_up(screen, button, modifiers)
    }

    pub fn on_pointer_leave(&self) -> Vec<Action> {
        self.core.borrow_mut().on_pointer_leave()
    }

    pub fn on_double_click(&self, screen: Point) -> Vec<Action> {
        self.core.borrow_mut().on_double_click(screen)
    }

    pub fn on_wheel(&self, delta: WheelDelta) -> Vec<Action> {
        self.core.borrow_mut().on_wheel(delta)
    }

    pub fn on_key_down(&self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.borrow_mut().on_key_down(key, modifiers)
    }

    pub fn on_tick(&self) -> Vec<Action> {
        self.core.borrow_mut().on_tick()
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a `Canvas2D` call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let core = self.core.borrow();
        render::draw(&ctx, &render::build_scene(&core), core.dpr)
    }
}
