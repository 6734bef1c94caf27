#![allow(clippy::float_cmp)]

use std::rc::Rc;

use uuid::Uuid;

use super::*;
use crate::camera::Camera;
use crate::config::CanvasConfig;
use crate::doc::NoteColor;
use crate::input::{Button, Modifiers};
use crate::presence::PresenceChannel;
use crate::sync::{PeerEvent, QueryState};
use crate::test_helpers::{RecordingPresence, clock, identity, note, snapshot, store};

fn ready_core(notes: usize) -> EngineCore {
    let (doc, _rx) = store(clock());
    let mut core = EngineCore::new(doc, CanvasConfig::default());
    let board_id = core.doc.board_id();
    let notes = (0..notes)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let offset = i as f64 * 250.0;
            note(board_id, offset, 0.0, 200.0, 150.0)
        })
        .collect();
    core.apply_query(QueryState::Ready(Some(snapshot(board_id, notes))));
    core.set_viewport(1000.0, 800.0, 1.0);
    core
}

#[test]
fn notes_are_projected_to_screen() {
    let mut core = ready_core(1);
    core.camera = Camera::with_view(2.0, Point::new(10.0, 20.0));

    let scene = build_scene(&core);

    assert_eq!(scene.notes.len(), 1);
    let sprite = &scene.notes[0];
    assert_eq!((sprite.x, sprite.y), (10.0, 20.0));
    assert_eq!((sprite.width, sprite.height), (400.0, 300.0));
    assert_eq!(sprite.font_px, 28.0);
    assert_eq!(sprite.fill, NoteColor::Yellow.fill());
    assert_eq!(sprite.lines, vec!["hello".to_owned()]);
    assert_eq!(scene.zoom_percent, 200);
}

#[test]
fn selected_and_editing_flags() {
    let mut core = ready_core(2);
    let first = core.doc.notes_in_draw_order().iter().find(|n| n.x == 0.0).unwrap().id;
    let at = Point::new(50.0, 50.0);
    core.on_pointer_down(at, Button::Primary, Modifiers::default());
    core.on_pointer_up(at, Button::Primary, Modifiers::default());
    core.on_double_click(at);

    let scene = build_scene(&core);
    let sprite = scene.notes.iter().find(|s| s.id == first).unwrap();

    assert!(sprite.selected);
    assert!(sprite.editing);
    assert!(sprite.lines.is_empty(), "editor covers the text");
    assert!(scene.notes.iter().filter(|s| s.id != first).all(|s| !s.selected && !s.editing));
}

#[test]
fn offscreen_notes_are_culled() {
    let mut core = ready_core(1);
    core.camera.pan_x = -5000.0;

    assert!(build_scene(&core).notes.is_empty());
}

#[test]
fn unsized_viewport_culls_nothing() {
    let mut core = ready_core(1);
    core.set_viewport(0.0, 0.0, 1.0);
    core.camera.pan_x = -5000.0;

    assert_eq!(build_scene(&core).notes.len(), 1);
}

#[test]
fn grid_follows_pan_and_hides_when_dense() {
    let mut core = ready_core(0);
    core.camera.pan_x = 45.0;
    core.camera.pan_y = -5.0;

    let grid = build_scene(&core).grid.unwrap();
    assert_eq!(grid.spacing, 20.0);
    assert_eq!((grid.offset_x, grid.offset_y), (5.0, 15.0));

    core.camera = Camera::with_view(0.1, Point::default());
    assert!(build_scene(&core).grid.is_none());
}

#[test]
fn banner_reflects_load_status() {
    let (doc, _rx) = store(clock());
    let mut core = EngineCore::new(doc, CanvasConfig::default());
    assert_eq!(build_scene(&core).banner.as_deref(), Some("Loading board..."));

    core.apply_query(QueryState::Ready(None));
    assert_eq!(build_scene(&core).banner.as_deref(), Some("Board not found"));

    let board_id = core.doc.board_id();
    core.apply_query(QueryState::Ready(Some(snapshot(board_id, Vec::new()))));
    assert_eq!(build_scene(&core).banner.as_deref(), Some("Double-click anywhere to create a note"));

    core.apply_query(QueryState::Failed("offline".to_owned()));
    assert_eq!(build_scene(&core).banner.as_deref(), Some("Connection problem: offline"));
}

#[test]
fn populated_board_has_no_banner() {
    assert!(build_scene(&ready_core(1)).banner.is_none());
}

#[test]
fn presence_lists_self_first_and_draws_only_peers() {
    let mut core = ready_core(0);
    let transport = Rc::new(RecordingPresence::default());
    let (channel, _events) = PresenceChannel::join(
        transport.clone(),
        clock(),
        core.doc.board_id(),
        &identity("user-1", Some("zed@example.com")),
        0,
    );
    core.attach_presence(channel);
    let mut peer = core.presence.as_ref().unwrap().me().clone();
    peer.name = "amy".to_owned();
    peer.cursor_x = 300.0;
    peer.cursor_y = 40.0;
    let peer_id = Uuid::new_v4();
    core.apply_peer_event(PeerEvent::Upsert { connection: peer_id, record: peer });

    let scene = build_scene(&core);

    assert_eq!(scene.cursors.len(), 1);
    assert_eq!(scene.cursors[0].connection, peer_id);
    assert_eq!((scene.cursors[0].x, scene.cursors[0].y), (300.0, 40.0));
    let names: Vec<(&str, char, bool)> =
        scene.online.iter().map(|b| (b.name.as_str(), b.initial, b.is_self)).collect();
    assert_eq!(names, vec![("zed", 'Z', true), ("amy", 'A', false)]);
}

#[test]
fn no_presence_after_unmount() {
    let mut core = ready_core(0);
    let (channel, _events) = PresenceChannel::join(
        Rc::new(RecordingPresence::default()),
        clock(),
        core.doc.board_id(),
        &identity("user-1", None),
        0,
    );
    core.attach_presence(channel);
    core.unmount();

    let scene = build_scene(&core);
    assert!(scene.online.is_empty());
    assert!(scene.cursors.is_empty());
}
