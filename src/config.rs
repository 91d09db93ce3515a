// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{
    DEFAULT_BLOCK_SIZE, DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
    clamp_block_size,
};
use crate::errors::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Start with the pixelation effect on
    pub effect_enabled: bool,
    /// Mosaic tile side in source-texture pixels
    pub block_size: f32,
    /// Capture resolution width
    pub capture_width: u32,
    /// Capture resolution height
    pub capture_height: u32,
    /// Capture framerate
    pub capture_fps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            effect_enabled: false,
            block_size: DEFAULT_BLOCK_SIZE,
            capture_width: DEFAULT_CAPTURE_WIDTH,
            capture_height: DEFAULT_CAPTURE_HEIGHT,
            capture_fps: DEFAULT_CAPTURE_FPS,
        }
    }
}

impl Config {
    /// Load from the user config file, falling back to defaults when the
    /// file is missing. A malformed file is an error, not a silent reset.
    pub fn load() -> PipelineResult<Self> {
        let Some(path) = Self::config_path() else {
            warn!("no config directory available, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| PipelineError::Config(format!("reading {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::Config(format!("parsing {}: {e}", path.display())))?;
        Ok(config.sanitized())
    }

    pub fn save(&self) -> PipelineResult<()> {
        let Some(path) = Self::config_path() else {
            return Err(PipelineError::Config(
                "no config directory available".into(),
            ));
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PipelineError::Config(format!("creating {}: {e}", parent.display())))?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Config(format!("serializing config: {e}")))?;
        std::fs::write(&path, raw)
            .map_err(|e| PipelineError::Config(format!("writing {}: {e}", path.display())))?;
        Ok(())
    }

    /// Clamp out-of-range values instead of rejecting the whole file
    pub fn sanitized(mut self) -> Self {
        self.block_size = clamp_block_size(self.block_size);
        if self.capture_width == 0 || self.capture_height == 0 {
            warn!(
                width = self.capture_width,
                height = self.capture_height,
                "invalid capture resolution in config, using defaults"
            );
            self.capture_width = DEFAULT_CAPTURE_WIDTH;
            self.capture_height = DEFAULT_CAPTURE_HEIGHT;
        }
        if self.capture_fps == 0 {
            self.capture_fps = DEFAULT_CAPTURE_FPS;
        }
        self
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pixelize").join("config.json"))
    }
}
