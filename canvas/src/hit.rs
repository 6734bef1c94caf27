#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::doc::{DocStore, NoteId};

/// The topmost note under `world_pt`, or `None` for empty background.
///
/// Notes later in draw order sit on top, so they are checked first.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &DocStore) -> Option<NoteId> {
    doc.notes_in_draw_order()
        .into_iter()
        .rev()
        .find(|note| note.contains(world_pt))
        .map(|note| note.id)
}
