use uuid::Uuid;

use super::*;

#[test]
fn command_is_ctrl_or_meta() {
    assert!(!Modifiers::default().command());
    assert!(Modifiers { ctrl: true, ..Default::default() }.command());
    assert!(Modifiers { meta: true, ..Default::default() }.command());
    assert!(!Modifiers { shift: true, alt: true, ..Default::default() }.command());
}

#[test]
fn delete_keys() {
    assert!(Key::new("Delete").is_delete());
    assert!(Key::new("Backspace").is_delete());
    assert!(!Key::new("d").is_delete());
    assert!(!Key::new("delete").is_delete());
}

#[test]
fn escape_and_enter() {
    assert!(Key::new("Escape").is_escape());
    assert!(Key::new("Enter").is_enter());
    assert!(!Key::new("Esc").is_escape());
}

#[test]
fn input_state_default_is_idle() {
    assert_eq!(InputState::default(), InputState::Idle);
    assert_eq!(InputState::default().name(), "idle");
}

#[test]
fn note_id_tracks_bound_gestures() {
    let id = Uuid::new_v4();
    assert_eq!(InputState::Panning.note_id(), None);
    assert_eq!(InputState::DraggingNote { id, anchor: Point::default() }.note_id(), Some(id));
    let editing = InputState::EditingText { id, buffer: String::new() };
    assert_eq!(editing.note_id(), Some(id));
    assert_eq!(editing.editing_id(), Some(id));
    assert_eq!(InputState::DraggingNote { id, anchor: Point::default() }.editing_id(), None);
}

#[test]
fn ui_state_default_is_empty() {
    let ui = UiState::default();
    assert!(ui.selected_id.is_none());
    assert!(ui.pending_edit.is_none());
}
