//! Demo configuration from the environment.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use canvas::config::{CanvasConfig, env_parse};

const DEFAULT_BOARD_NAME: &str = "Demo board";
const DEFAULT_DRAG_STEPS: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    pub board_name: String,
    /// Pointer moves per simulated drag; each one is a separate write.
    pub drag_steps: u32,
    pub canvas: CanvasConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { board_name: DEFAULT_BOARD_NAME.to_owned(), drag_steps: DEFAULT_DRAG_STEPS, canvas: CanvasConfig::default() }
    }
}

impl DemoConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// - `DEMO_BOARD_NAME`
    /// - `DEMO_DRAG_STEPS` (at least 1)
    /// - the `CANVAS_*` engine variables
    #[must_use]
    pub fn from_env() -> Self {
        let board_name = std::env::var("DEMO_BOARD_NAME")
            .ok()
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_BOARD_NAME.to_owned());
        Self {
            board_name,
            drag_steps: env_parse("DEMO_DRAG_STEPS", DEFAULT_DRAG_STEPS).max(1),
            canvas: CanvasConfig::from_env(),
        }
    }
}
