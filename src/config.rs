//! Scene configuration.
//!
//! [`SceneConfig`] collects the literal values the room scene is built from:
//! where the canvas and assets live, whether development tooling is loaded and
//! how the engine surface is set up. Defaults describe the shipped scene; a few
//! values can be overridden from the environment on native targets.

use std::str::FromStr;

use anyhow::bail;

/// Environment variable that selects the [`RunMode`] on native targets.
pub const MODE_ENV_VAR: &str = "PIXEL_ROOM_MODE";

/// Development mode loads the debug layer and binds its toggle key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn is_development(&self) -> bool {
        matches!(self, RunMode::Development)
    }

    /// The mode a build defaults to when nothing else is configured.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            RunMode::Development
        } else {
            RunMode::Production
        }
    }
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            other => bail!("unknown run mode '{other}', expected 'development' or 'production'"),
        }
    }
}

/// Surface options handed to the engine when the canvas is created.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub antialias: bool,
    /// Render at the physical resolution of the display instead of CSS pixels.
    pub adapt_to_device_ratio: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            adapt_to_device_ratio: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub canvas_id: String,
    pub window_title: String,
    /// Directory (native) or URL path segment (web) all assets are resolved against.
    pub asset_root: String,
    /// Room model, relative to `asset_root`.
    pub room_model: String,
    pub mode: RunMode,
    pub engine: EngineOptions,
    pub clear_colour: wgpu::Color,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            canvas_id: "canvas".to_string(),
            window_title: "pixel room".to_string(),
            asset_root: "assets".to_string(),
            room_model: "glb/pixel_room.glb".to_string(),
            mode: RunMode::from_build(),
            engine: EngineOptions::default(),
            clear_colour: wgpu::Color {
                r: 0.2,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
        }
    }
}

impl SceneConfig {
    /// Defaults with overrides from the process environment.
    ///
    /// An unparsable [`MODE_ENV_VAR`] is reported and ignored. On the web there
    /// is no environment and this is the same as [`SceneConfig::default`].
    pub fn from_env() -> Self {
        let mut config = Self::default();
        #[cfg(not(target_arch = "wasm32"))]
        if let Ok(raw) = std::env::var(MODE_ENV_VAR) {
            config.apply_mode(&raw);
        }
        config
    }

    fn apply_mode(&mut self, raw: &str) {
        match raw.parse::<RunMode>() {
            Ok(mode) => self.mode = mode,
            Err(e) => log::warn!("ignoring {MODE_ENV_VAR}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_modes_case_insensitively() {
        assert_eq!("development".parse::<RunMode>().unwrap(), RunMode::Development);
        assert_eq!(" Production ".parse::<RunMode>().unwrap(), RunMode::Production);
        assert_eq!("DEV".parse::<RunMode>().unwrap(), RunMode::Development);
        assert!("staging".parse::<RunMode>().is_err());
    }

    #[test]
    fn invalid_mode_keeps_previous_value() {
        let mut config = SceneConfig {
            mode: RunMode::Production,
            ..Default::default()
        };
        config.apply_mode("nonsense");
        assert_eq!(config.mode, RunMode::Production);
        config.apply_mode("development");
        assert!(config.mode.is_development());
    }

    #[test]
    fn defaults_point_at_the_room_model() {
        let config = SceneConfig::default();
        assert_eq!(config.canvas_id, "canvas");
        assert_eq!(config.room_model, "glb/pixel_room.glb");
        assert!(config.engine.antialias);
        assert!(config.engine.adapt_to_device_ratio);
    }
}
