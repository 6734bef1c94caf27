//! Engine tunables.
//!
//! Defaults reproduce the baseline behavior: every cursor move is published,
//! new notes enter editing after 50 ms. Environment variables override them
//! where a process environment exists (tests, native hosts); in the browser
//! `from_env` simply yields the defaults.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::consts::{EDIT_FOCUS_DELAY_MS, GRID_SPACING, WHEEL_ZOOM_FACTOR};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasConfig {
    /// Delay between creating a note and opening its editor.
    pub edit_focus_delay_ms: u64,
    /// Wheel pixels to zoom delta multiplier.
    pub wheel_zoom_factor: f64,
    /// Minimum spacing between cursor publishes; 0 publishes every move.
    pub cursor_publish_interval_ms: u64,
    /// Merge queued updates to the same note before sending.
    pub coalesce_updates: bool,
    /// Background grid spacing in world units.
    pub grid_spacing: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            edit_focus_delay_ms: EDIT_FOCUS_DELAY_MS,
            wheel_zoom_factor: WHEEL_ZOOM_FACTOR,
            cursor_publish_interval_ms: 0,
            coalesce_updates: true,
            grid_spacing: GRID_SPACING,
        }
    }
}

impl CanvasConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// - `CANVAS_EDIT_FOCUS_DELAY_MS`
    /// - `CANVAS_WHEEL_ZOOM_FACTOR`
    /// - `CANVAS_CURSOR_PUBLISH_INTERVAL_MS`
    /// - `CANVAS_COALESCE_UPDATES` (`true` / `false`)
    /// - `CANVAS_GRID_SPACING`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            edit_focus_delay_ms: env_parse("CANVAS_EDIT_FOCUS_DELAY_MS", defaults.edit_focus_delay_ms),
            wheel_zoom_factor: env_parse("CANVAS_WHEEL_ZOOM_FACTOR", defaults.wheel_zoom_factor),
            cursor_publish_interval_ms: env_parse(
                "CANVAS_CURSOR_PUBLISH_INTERVAL_MS",
                defaults.cursor_publish_interval_ms,
            ),
            coalesce_updates: env_parse("CANVAS_COALESCE_UPDATES", defaults.coalesce_updates),
            grid_spacing: env_parse("CANVAS_GRID_SPACING", defaults.grid_spacing),
        }
    }
}

/// Parse `key` from the environment, or `default` when missing or malformed.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
