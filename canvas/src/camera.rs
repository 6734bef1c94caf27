#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use std::ops::{Add, Sub};

use crate::consts::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Camera state for pan/zoom on the infinite canvas.
///
/// `pan_x` / `pan_y` are in CSS pixels.
/// `zoom` is a scale factor (1.0 = no zoom), kept within `[MIN_ZOOM, MAX_ZOOM]`.
///
/// Zoom is anchored at the world origin: changing it never moves the pan
/// offset, so the point under the pointer drifts while zooming.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
    /// `screen - pan` captured at pan start; `None` when no pan is active.
    pan_anchor: Option<Point>,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0, pan_anchor: None }
    }
}

impl Camera {
    /// Build a camera with an explicit zoom and pan. Zoom is clamped.
    #[must_use]
    pub fn with_view(zoom: f64, pan: Point) -> Self {
        let zoom = if zoom.is_finite() { zoom.clamp(MIN_ZOOM, MAX_ZOOM) } else { 1.0 };
        Self { pan_x: pan.x, pan_y: pan.y, zoom, pan_anchor: None }
    }

    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a world-space distance to a screen-space distance (pixels).
    #[must_use]
    pub fn world_dist_to_screen(&self, world_dist: f64) -> f64 {
        world_dist * self.zoom
    }

    // --- Panning ---

    /// Start a pan gesture at `screen`.
    pub fn begin_pan(&mut self, screen: Point) {
        self.pan_anchor = Some(Point::new(screen.x - self.pan_x, screen.y - self.pan_y));
    }

    /// Move the pan so the anchor stays under `screen`. Returns `false` when no pan is active.
    pub fn continue_pan(&mut self, screen: Point) -> bool {
        let Some(anchor) = self.pan_anchor else {
            return false;
        };
        self.pan_x = screen.x - anchor.x;
        self.pan_y = screen.y - anchor.y;
        true
    }

    /// Finish the active pan gesture, if any.
    pub fn end_pan(&mut self) {
        self.pan_anchor = None;
    }

    #[must_use]
    pub fn is_panning(&self) -> bool {
        self.pan_anchor.is_some()
    }

    // --- Zoom ---

    /// Add `delta` to the zoom factor, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    /// Non-finite deltas are ignored.
    pub fn zoom_by(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(-ZOOM_STEP);
    }

    /// Back to zoom 1 at the world origin.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Zoom as a rounded percentage for the zoom indicator.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }
}
