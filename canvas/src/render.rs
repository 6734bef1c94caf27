//! Rendering: builds a screen-space scene from engine state and paints it on a 2D context.
//!
//! [`build_scene`] is pure and does all the coordinate work (world to screen,
//! culling, grid phase, presence ordering), so it can be tested natively.
//! [`draw`] is the only place that touches [`web_sys::CanvasRenderingContext2d`];
//! it does not mutate any application state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::camera::Point;
use crate::doc::{LoadStatus, NoteId};
use crate::engine::EngineCore;
use crate::sync::ConnectionId;

/// Grid lines closer than this on screen are skipped.
const MIN_GRID_PX: f64 = 4.0;
/// Note text size at zoom 1, in CSS pixels.
const NOTE_FONT_PX: f64 = 14.0;
/// Inner padding of a note at zoom 1.
const NOTE_PADDING: f64 = 12.0;
const BACKGROUND: &str = "#F9FAFB";
const GRID_COLOR: &str = "#E5E7EB";
const NOTE_BORDER: &str = "rgba(0, 0, 0, 0.08)";
const SELECTION_COLOR: &str = "#3B82F6";
const TEXT_COLOR: &str = "#1F2937";
const BADGE_RADIUS: f64 = 14.0;

/// Background grid in screen space: lines at `offset + k * spacing`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub spacing: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// A note as it appears on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSprite {
    pub id: NoteId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: &'static str,
    /// Content lines; empty while the host editor covers the note.
    pub lines: Vec<String>,
    pub font_px: f64,
    pub selected: bool,
    pub editing: bool,
}

/// A peer's cursor at its canvas-local screen position.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorSprite {
    pub connection: ConnectionId,
    pub name: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
}

/// One avatar in the online list.
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineBadge {
    pub name: String,
    pub color: String,
    pub initial: char,
    pub is_self: bool,
}

/// Everything one frame shows, in CSS pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub grid: Option<Grid>,
    /// Bottom first.
    pub notes: Vec<NoteSprite>,
    pub cursors: Vec<CursorSprite>,
    /// This client first, then peers by name.
    pub online: Vec<OnlineBadge>,
    pub zoom_percent: u32,
    /// Centered status line: loading, errors, or the empty-board hint.
    pub banner: Option<String>,
}

/// Project the engine's state into a [`Scene`].
#[must_use]
pub fn build_scene(core: &EngineCore) -> Scene {
    let camera = core.camera;
    let width = core.viewport_width;
    let height = core.viewport_height;

    let spacing = camera.world_dist_to_screen(core.config.grid_spacing);
    let grid = (spacing >= MIN_GRID_PX).then(|| Grid {
        spacing,
        offset_x: camera.pan_x.rem_euclid(spacing),
        offset_y: camera.pan_y.rem_euclid(spacing),
    });

    let editing = core.input.editing_id();
    let notes = core
        .doc
        .notes_in_draw_order()
        .into_iter()
        .filter_map(|note| {
            let origin = camera.world_to_screen(note.position());
            let w = camera.world_dist_to_screen(note.width);
            let h = camera.world_dist_to_screen(note.height);
            if !intersects_viewport(origin, w, h, width, height) {
                return None;
            }
            let is_editing = editing == Some(note.id);
            Some(NoteSprite {
                id: note.id,
                x: origin.x,
                y: origin.y,
                width: w,
                height: h,
                fill: note.color.fill(),
                lines: if is_editing { Vec::new() } else { note.content.lines().map(str::to_owned).collect() },
                font_px: camera.world_dist_to_screen(NOTE_FONT_PX),
                selected: core.ui.selected_id == Some(note.id),
                editing: is_editing,
            })
        })
        .collect();

    let mut cursors = Vec::new();
    let mut online = Vec::new();
    if let Some(presence) = core.presence.as_ref().filter(|p| p.is_joined()) {
        online.push(badge(&presence.me().name, &presence.me().color, true));
        for (connection, record) in presence.peers_sorted() {
            cursors.push(CursorSprite {
                connection,
                name: record.name.clone(),
                color: record.color.clone(),
                x: record.cursor_x,
                y: record.cursor_y,
            });
            online.push(badge(&record.name, &record.color, false));
        }
    }

    let banner = match core.doc.status() {
        LoadStatus::Loading => Some("Loading board...".to_owned()),
        LoadStatus::NotFound => Some("Board not found".to_owned()),
        LoadStatus::Failed(message) => Some(format!("Connection problem: {message}")),
        LoadStatus::Ready if core.doc.is_empty() => Some("Double-click anywhere to create a note".to_owned()),
        LoadStatus::Ready => None,
    };

    Scene { width, height, grid, notes, cursors, online, zoom_percent: camera.zoom_percent(), banner }
}

fn badge(name: &str, color: &str, is_self: bool) -> OnlineBadge {
    let initial = name.chars().next().map_or('?', |c| c.to_uppercase().next().unwrap_or(c));
    OnlineBadge { name: name.to_owned(), color: color.to_owned(), initial, is_self }
}

/// Whether a screen rectangle overlaps the viewport. An unsized viewport shows everything.
fn intersects_viewport(origin: Point, w: f64, h: f64, viewport_w: f64, viewport_h: f64) -> bool {
    if viewport_w <= 0.0 || viewport_h <= 0.0 {
        return true;
    }
    origin.x + w >= 0.0 && origin.y + h >= 0.0 && origin.x <= viewport_w && origin.y <= viewport_h
}

// =============================================================
// Painting
// =============================================================

/// Paint `scene`. `dpr` is the device pixel ratio.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(ctx: &CanvasRenderingContext2d, scene: &Scene, dpr: f64) -> Result<(), JsValue> {
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, scene.width, scene.height);
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, scene.width, scene.height);

    if let Some(grid) = scene.grid {
        draw_grid(ctx, grid, scene.width, scene.height);
    }
    for note in &scene.notes {
        draw_note(ctx, note)?;
    }
    for cursor in &scene.cursors {
        draw_cursor(ctx, cursor)?;
    }
    draw_online(ctx, &scene.online, scene.width)?;
    draw_zoom_indicator(ctx, scene.zoom_percent, scene.height)?;
    if let Some(banner) = &scene.banner {
        draw_banner(ctx, banner, scene.width, scene.height)?;
    }
    Ok(())
}

fn draw_grid(ctx: &CanvasRenderingContext2d, grid: Grid, width: f64, height: f64) {
    ctx.set_stroke_style_str(GRID_COLOR);
    ctx.set_line_width(1.0);
    ctx.begin_path();
    let mut x = grid.offset_x;
    while x <= width {
        ctx.move_to(x, 0.0);
        ctx.line_to(x, height);
        x += grid.spacing;
    }
    let mut y = grid.offset_y;
    while y <= height {
        ctx.move_to(0.0, y);
        ctx.line_to(width, y);
        y += grid.spacing;
    }
    ctx.stroke();
}

fn draw_note(ctx: &CanvasRenderingContext2d, note: &NoteSprite) -> Result<(), JsValue> {
    ctx.save();

    ctx.set_fill_style_str(note.fill);
    ctx.fill_rect(note.x, note.y, note.width, note.height);

    if note.selected {
        ctx.set_stroke_style_str(SELECTION_COLOR);
        ctx.set_line_width(2.0);
    } else {
        ctx.set_stroke_style_str(NOTE_BORDER);
        ctx.set_line_width(1.0);
    }
    ctx.stroke_rect(note.x, note.y, note.width, note.height);

    if !note.lines.is_empty() {
        let scale = note.font_px / NOTE_FONT_PX;
        let padding = NOTE_PADDING * scale;
        let line_height = note.font_px * 1.3;
        ctx.set_fill_style_str(TEXT_COLOR);
        ctx.set_text_align("left");
        ctx.set_text_baseline("top");
        ctx.set_font(&format!("{:.1}px sans-serif", note.font_px));

        let mut y = note.y + padding;
        for line in &note.lines {
            if y + line_height > note.y + note.height - padding {
                break;
            }
            ctx.fill_text_with_max_width(line, note.x + padding, y, (note.width - 2.0 * padding).max(0.0))?;
            y += line_height;
        }
    }

    ctx.restore();
    Ok(())
}

fn draw_cursor(ctx: &CanvasRenderingContext2d, cursor: &CursorSprite) -> Result<(), JsValue> {
    ctx.save();
    ctx.translate(cursor.x, cursor.y)?;

    ctx.begin_path();
    ctx.move_to(0.0, 0.0);
    ctx.line_to(0.0, 16.0);
    ctx.line_to(4.5, 12.0);
    ctx.line_to(11.0, 11.0);
    ctx.close_path();
    ctx.set_fill_style_str(&cursor.color);
    ctx.fill();

    ctx.set_font("12px sans-serif");
    ctx.set_text_align("left");
    ctx.set_text_baseline("top");
    let label_w = text_width(ctx, &cursor.name) + 8.0;
    ctx.fill_rect(12.0, 16.0, label_w, 18.0);
    ctx.set_fill_style_str("#FFFFFF");
    ctx.fill_text(&cursor.name, 16.0, 19.0)?;

    ctx.restore();
    Ok(())
}

fn draw_online(ctx: &CanvasRenderingContext2d, online: &[OnlineBadge], width: f64) -> Result<(), JsValue> {
    if online.is_empty() {
        return Ok(());
    }
    ctx.save();
    ctx.set_font("bold 12px sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");

    let step = BADGE_RADIUS * 2.0 + 4.0;
    let mut cx = width - 16.0 - BADGE_RADIUS;
    let cy = 16.0 + BADGE_RADIUS;
    for badge in online {
        ctx.begin_path();
        ctx.arc(cx, cy, BADGE_RADIUS, 0.0, 2.0 * PI)?;
        ctx.set_fill_style_str(&badge.color);
        ctx.fill();
        if badge.is_self {
            ctx.set_stroke_style_str(TEXT_COLOR);
            ctx.set_line_width(2.0);
            ctx.stroke();
        }
        ctx.set_fill_style_str("#FFFFFF");
        ctx.fill_text(&badge.initial.to_string(), cx, cy)?;
        cx -= step;
    }

    ctx.set_fill_style_str(TEXT_COLOR);
    ctx.set_font("12px sans-serif");
    ctx.set_text_align("right");
    ctx.fill_text(&format!("{} online", online.len()), width - 16.0, cy + BADGE_RADIUS + 12.0)?;

    ctx.restore();
    Ok(())
}

fn draw_zoom_indicator(ctx: &CanvasRenderingContext2d, zoom_percent: u32, height: f64) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_fill_style_str(TEXT_COLOR);
    ctx.set_font("12px sans-serif");
    ctx.set_text_align("left");
    ctx.set_text_baseline("bottom");
    ctx.fill_text(&format!("{zoom_percent}%"), 16.0, height - 16.0)?;
    ctx.restore();
    Ok(())
}

fn draw_banner(ctx: &CanvasRenderingContext2d, text: &str, width: f64, height: f64) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_fill_style_str("#6B7280");
    ctx.set_font("16px sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.fill_text(text, width * 0.5, height * 0.5)?;
    ctx.restore();
    Ok(())
}

fn text_width(ctx: &CanvasRenderingContext2d, text: &str) -> f64 {
    match ctx.measure_text(text) {
        Ok(metrics) => metrics.width(),
        Err(_) => 0.0,
    }
}
