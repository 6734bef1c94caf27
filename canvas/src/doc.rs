//! Document model: board records and the optimistic note store.
//!
//! This module defines what a board contains (`Board`, `Note`, and the
//! reserved `Shape`), the sparse-update type for incremental edits
//! (`NotePatch`), and the runtime store that owns the client's view of the
//! board's notes (`DocStore`).
//!
//! Local edits land in `DocStore` immediately and are queued on the
//! [`Outbox`](crate::outbox::Outbox) for the sync service; nothing waits for
//! an acknowledgment. Authoritative snapshots pushed by the service replace
//! the local view wholesale: last-write-wins arbitration happens in the
//! service, not here.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::camera::Point;
use crate::consts::{DEFAULT_NOTE_CONTENT, DEFAULT_NOTE_HEIGHT, DEFAULT_NOTE_WIDTH};
use crate::error::StoreError;
use crate::outbox::{Outbox, Receipt};
use crate::sync::{Clock, Mutation, QueryState};

/// Unique identifier for a note. Generated client-side.
pub type NoteId = Uuid;

/// Unique identifier for a board.
pub type BoardId = Uuid;

/// Stable identifier of a signed-in user, supplied by the identity service.
pub type UserId = String;

// =============================================================================
// ENUMS
// =============================================================================

/// Note background color.
///
/// Decoding never fails: unknown names fall back to [`NoteColor::Yellow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NoteColor {
    #[default]
    Yellow,
    Pink,
    Blue,
    Green,
    Purple,
}

impl NoteColor {
    /// Picker order.
    pub const ALL: [NoteColor; 5] = [Self::Yellow, Self::Pink, Self::Blue, Self::Green, Self::Purple];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Pink => "pink",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Purple => "purple",
        }
    }

    /// Fill color as a CSS hex string.
    #[must_use]
    pub fn fill(self) -> &'static str {
        match self {
            Self::Yellow => "#FEF3C7",
            Self::Pink => "#FCE7F3",
            Self::Blue => "#DBEAFE",
            Self::Green => "#D1FAE5",
            Self::Purple => "#E9D5FF",
        }
    }

    /// Parse a stored color name, falling back to the default for anything unrecognized.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .unwrap_or_default()
    }
}

impl From<String> for NoteColor {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<NoteColor> for String {
    fn from(color: NoteColor) -> Self {
        color.as_str().to_owned()
    }
}

/// Shape type for the reserved `Shape` entity.
///
/// Decoding never fails: unknown names fall back to [`ShapeKind::Rectangle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
    Triangle,
    Line,
    Arrow,
}

impl ShapeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Triangle => "triangle",
            Self::Line => "line",
            Self::Arrow => "arrow",
        }
    }
}

impl From<String> for ShapeKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "circle" => Self::Circle,
            "triangle" => Self::Triangle,
            "line" => Self::Line,
            "arrow" => Self::Arrow,
            _ => Self::Rectangle,
        }
    }
}

impl From<ShapeKind> for String {
    fn from(kind: ShapeKind) -> Self {
        kind.as_str().to_owned()
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// A board as returned by the board query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub created_at: i64,
    #[serde(default)]
    pub creator: Option<UserId>,
}

/// A sticky note as stored in the document and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// The board this note belongs to.
    pub board_id: BoardId,
    pub content: String,
    /// Left edge in world coordinates.
    pub x: f64,
    /// Top edge in world coordinates.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub color: NoteColor,
    pub created_at: i64,
    /// Last-write-wins arbitration key, in milliseconds.
    pub updated_at: i64,
    #[serde(default)]
    pub created_by: Option<UserId>,
}

impl Note {
    /// Top-left corner in world coordinates.
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether a world-space point lies inside the note's rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, world: Point) -> bool {
        world.x >= self.x && world.x <= self.x + self.width && world.y >= self.y && world.y <= self.y + self.height
    }
}

/// Reserved shape entity: carried through snapshots, never edited here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: Uuid,
    #[serde(rename = "type", default)]
    pub kind: ShapeKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub stroke_width: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Everything the board query returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub board: Board,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

/// Caller-supplied fields for a new note. Everything else is filled in by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDraft {
    pub position: Point,
    pub content: String,
    pub color: NoteColor,
    pub width: f64,
    pub height: f64,
}

impl NoteDraft {
    /// Default note ("New note", yellow, 200×150) at a world position.
    #[must_use]
    pub fn at(position: Point) -> Self {
        Self {
            position,
            content: DEFAULT_NOTE_CONTENT.to_owned(),
            color: NoteColor::default(),
            width: DEFAULT_NOTE_WIDTH,
            height: DEFAULT_NOTE_HEIGHT,
        }
    }
}

/// Sparse update for a note. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<NoteColor>,
    /// Stamped by the store when the patch is applied locally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl NotePatch {
    #[must_use]
    pub fn position(position: Point) -> Self {
        Self { x: Some(position.x), y: Some(position.y), ..Self::default() }
    }

    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    #[must_use]
    pub fn color(color: NoteColor) -> Self {
        Self { color: Some(color), ..Self::default() }
    }

    /// True when no editable field is set (`updated_at` alone does not count).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.x.is_none()
            && self.y.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.color.is_none()
    }

    /// Fold a later patch into this one; fields present in `later` win.
    pub fn merge(&mut self, later: NotePatch) {
        if later.content.is_some() {
            self.content = later.content;
        }
        if later.x.is_some() {
            self.x = later.x;
        }
        if later.y.is_some() {
            self.y = later.y;
        }
        if later.width.is_some() {
            self.width = later.width;
        }
        if later.height.is_some() {
            self.height = later.height;
        }
        if later.color.is_some() {
            self.color = later.color;
        }
        if later.updated_at.is_some() {
            self.updated_at = later.updated_at;
        }
    }

    /// Write the present fields onto `note`.
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(content) = &self.content {
            note.content.clone_from(content);
        }
        if let Some(x) = self.x {
            note.x = x;
        }
        if let Some(y) = self.y {
            note.y = y;
        }
        if let Some(w) = self.width {
            note.width = w;
        }
        if let Some(h) = self.height {
            note.height = h;
        }
        if let Some(color) = self.color {
            note.color = color;
        }
        if let Some(ts) = self.updated_at {
            note.updated_at = ts;
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Where the board subscription stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Loading,
    Ready,
    /// The service answered but the board does not exist.
    NotFound,
    /// The subscription reported an error; the last good notes stay visible.
    Failed(String),
}

/// Optimistic local mirror of one board's notes.
pub struct DocStore {
    board_id: BoardId,
    author: Option<UserId>,
    board: Option<Board>,
    notes: HashMap<NoteId, Note>,
    shapes: Vec<Shape>,
    status: LoadStatus,
    clock: Rc<dyn Clock>,
    outbox: Outbox,
}

impl DocStore {
    /// Create an empty store for `board_id`. `author` is recorded as `created_by` on new notes.
    #[must_use]
    pub fn new(board_id: BoardId, author: Option<UserId>, clock: Rc<dyn Clock>, outbox: Outbox) -> Self {
        Self {
            board_id,
            author,
            board: None,
            notes: HashMap::new(),
            shapes: Vec::new(),
            status: LoadStatus::Loading,
            clock,
            outbox,
        }
    }

    // --- Local edits ---

    /// Create a note locally and queue it for the service. Returns the new id immediately.
    pub fn create(&mut self, draft: NoteDraft) -> NoteId {
        let note = self.stage_create(draft);
        let id = note.id;
        self.outbox.send(Mutation::CreateNote(note));
        id
    }

    /// Like [`create`](Self::create), plus a receipt that resolves when the service answers.
    pub fn create_confirmed(&mut self, draft: NoteDraft) -> (NoteId, Receipt) {
        let note = self.stage_create(draft);
        let id = note.id;
        (id, self.outbox.send_confirmed(Mutation::CreateNote(note)))
    }

    /// Apply `patch` locally, stamp `updated_at`, and queue it.
    ///
    /// # Errors
    ///
    /// `NotFound` if the note is not in the store, `EmptyPatch` if the patch changes nothing.
    pub fn update(&mut self, id: &NoteId, patch: NotePatch) -> Result<(), StoreError> {
        let patch = self.stage_update(id, patch)?;
        self.outbox.send(Mutation::UpdateNote { id: *id, patch });
        Ok(())
    }

    /// Like [`update`](Self::update), plus a receipt for the service's answer.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub fn update_confirmed(&mut self, id: &NoteId, patch: NotePatch) -> Result<Receipt, StoreError> {
        let patch = self.stage_update(id, patch)?;
        Ok(self.outbox.send_confirmed(Mutation::UpdateNote { id: *id, patch }))
    }

    /// Remove a note locally and queue the delete. Returns the removed note.
    ///
    /// # Errors
    ///
    /// `NotFound` if the note is not in the store.
    pub fn delete(&mut self, id: &NoteId) -> Result<Note, StoreError> {
        let note = self.notes.remove(id).ok_or(StoreError::NotFound(*id))?;
        debug!(%id, "note deleted locally");
        self.outbox.send(Mutation::DeleteNote { id: *id });
        Ok(note)
    }

    /// Like [`delete`](Self::delete), plus a receipt for the service's answer.
    ///
    /// # Errors
    ///
    /// `NotFound` if the note is not in the store.
    pub fn delete_confirmed(&mut self, id: &NoteId) -> Result<(Note, Receipt), StoreError> {
        let note = self.notes.remove(id).ok_or(StoreError::NotFound(*id))?;
        Ok((note, self.outbox.send_confirmed(Mutation::DeleteNote { id: *id })))
    }

    fn stage_create(&mut self, draft: NoteDraft) -> Note {
        let now = self.clock.now_ms();
        let note = Note {
            id: Uuid::new_v4(),
            board_id: self.board_id,
            content: draft.content,
            x: draft.position.x,
            y: draft.position.y,
            width: draft.width,
            height: draft.height,
            color: draft.color,
            created_at: now,
            updated_at: now,
            created_by: self.author.clone(),
        };
        debug!(id = %note.id, x = note.x, y = note.y, "note created locally");
        self.notes.insert(note.id, note.clone());
        note
    }

    fn stage_update(&mut self, id: &NoteId, mut patch: NotePatch) -> Result<NotePatch, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::EmptyPatch(*id));
        }
        let note = self.notes.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        patch.updated_at = Some(self.clock.now_ms());
        patch.apply_to(note);
        Ok(patch)
    }

    // --- Remote data ---

    /// Fold one subscription push into the store.
    pub fn apply_query(&mut self, state: QueryState) {
        match state {
            QueryState::Loading => self.status = LoadStatus::Loading,
            QueryState::Failed(message) => {
                warn!(board_id = %self.board_id, %message, "board subscription failed");
                self.status = LoadStatus::Failed(message);
            }
            QueryState::Ready(None) => {
                debug!(board_id = %self.board_id, "board not found");
                self.board = None;
                self.notes.clear();
                self.shapes.clear();
                self.status = LoadStatus::NotFound;
            }
            QueryState::Ready(Some(snapshot)) => self.load_snapshot(snapshot),
        }
    }

    /// Replace the local view with an authoritative snapshot.
    ///
    /// Local writes the snapshot does not reflect yet are replayed on top, so
    /// a push that predates them never rolls them back.
    pub fn load_snapshot(&mut self, snapshot: BoardSnapshot) {
        let BoardSnapshot { board, notes, shapes } = snapshot;
        if board.id != self.board_id {
            warn!(expected = %self.board_id, got = %board.id, "snapshot for another board ignored");
            return;
        }
        let mut loaded = HashMap::with_capacity(notes.len());
        for note in notes {
            if note.board_id == self.board_id {
                loaded.insert(note.id, note);
            } else {
                debug!(id = %note.id, "note from another board dropped from snapshot");
            }
        }
        let replayed = self.outbox.rebase(&mut loaded);
        if replayed > 0 {
            debug!(board_id = %self.board_id, replayed, "unconfirmed local writes replayed over snapshot");
        }
        self.notes = loaded;
        self.board = Some(board);
        self.shapes = shapes;
        self.status = LoadStatus::Ready;
    }

    // --- Queries ---

    #[must_use]
    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    #[must_use]
    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    #[must_use]
    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &NoteId) -> bool {
        self.notes.contains_key(id)
    }

    /// Notes sorted by `(created_at, id)`; later entries draw on top.
    #[must_use]
    pub fn notes_in_draw_order(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self.notes.values().collect();
        notes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        notes
    }

    /// Reserved shapes from the last snapshot.
    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Current time on the store's clock.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Local writes that are still replayed over incoming snapshots.
    #[must_use]
    pub fn unconfirmed_writes(&self) -> usize {
        self.outbox.unconfirmed()
    }
}
