//! Input model: modifier keys, mouse buttons, keys, and the gesture state machine.
//!
//! `InputState` is the single active gesture. At most one of pan, drag, or
//! text edit is in progress at any time; the transitions between states live
//! in [`crate::engine::EngineCore`].

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::doc::NoteId;

/// Modifier keys held when the event fired.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    /// Alt, or Option on macOS.
    pub alt: bool,
    /// Meta, or Command on macOS.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer button. Only `Primary` starts gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left button, pen, or touch contact.
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key.
///
/// Holds `KeyboardEvent.key`, e.g. `"Delete"` or `"Escape"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Delete or Backspace.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self.0.as_str(), "Delete" | "Backspace")
    }

    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.0 == "Escape"
    }

    #[must_use]
    pub fn is_enter(&self) -> bool {
        self.0 == "Enter"
    }
}

/// Scroll delta from a wheel or trackpad event.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Pixels; positive scrolls down and zooms out.
    pub dy: f64,
}

/// Selection and pending UI work visible to the renderer. Never shared with peers.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// The single selected note, if any.
    pub selected_id: Option<NoteId>,
    /// A freshly created note waiting for the deferred tick to enter editing.
    pub pending_edit: Option<NoteId>,
    /// Clock time before which a tick leaves `pending_edit` alone.
    pub edit_due_ms: i64,
}

/// The gesture currently in progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// Nothing in progress.
    #[default]
    Idle,
    /// The user is panning the canvas by dragging the background.
    Panning,
    /// The user is moving a note across the canvas.
    DraggingNote {
        /// Id of the note being dragged.
        id: NoteId,
        /// Pointer position minus note position, in world units, captured at pointer-down.
        anchor: Point,
    },
    /// The host editor is open on a note.
    EditingText {
        /// Id of the note being edited.
        id: NoteId,
        /// Uncommitted text; written to the store on commit.
        buffer: String,
    },
}

impl InputState {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Panning => "panning",
            Self::DraggingNote { .. } => "dragging",
            Self::EditingText { .. } => "editing",
        }
    }

    /// The note this gesture is bound to, if any.
    #[must_use]
    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            Self::DraggingNote { id, .. } | Self::EditingText { id, .. } => Some(*id),
            Self::Idle | Self::Panning => None,
        }
    }

    #[must_use]
    pub fn editing_id(&self) -> Option<NoteId> {
        match self {
            Self::EditingText { id, .. } => Some(*id),
            _ => None,
        }
    }
}
