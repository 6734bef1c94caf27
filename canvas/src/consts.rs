//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 3.0;

/// Zoom change applied by the toolbar zoom-in / zoom-out buttons.
pub const ZOOM_STEP: f64 = 0.1;

/// Wheel delta (pixels) to zoom delta multiplier; negative wheel values zoom in.
pub const WHEEL_ZOOM_FACTOR: f64 = 0.001;

/// Background grid spacing in world units.
pub const GRID_SPACING: f64 = 20.0;

// ── Notes ───────────────────────────────────────────────────────

/// Width of a freshly created note in world units.
pub const DEFAULT_NOTE_WIDTH: f64 = 200.0;

/// Height of a freshly created note in world units.
pub const DEFAULT_NOTE_HEIGHT: f64 = 150.0;

/// Content of a freshly created note.
pub const DEFAULT_NOTE_CONTENT: &str = "New note";

/// Delay before a new note enters text editing, so the host editor exists before it is focused.
pub const EDIT_FOCUS_DELAY_MS: u64 = 50;

// ── Presence ────────────────────────────────────────────────────

/// Display name used when the signed-in user has no usable email.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Presence room type for boards.
pub const BOARD_ROOM: &str = "board";
