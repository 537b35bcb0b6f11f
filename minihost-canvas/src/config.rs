//! Host configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::Color;
use crate::error::{CanvasError, CanvasResult};

/// Default canvas width when the window size is unknown.
const DEFAULT_WIDTH: u32 = 800;

/// Default canvas height when the window size is unknown.
const DEFAULT_HEIGHT: u32 = 600;

/// Default upper bound on the pixels a single read-back or export may hold.
pub const DEFAULT_MAX_EXPORT_PIXELS: u64 = 8192 * 8192;

/// Settings for a [`crate::Host`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
    /// Directory for exported temp files.
    pub temp_dir: PathBuf,
    /// Canvas width used when system info is unavailable.
    pub default_width: u32,
    /// Canvas height used when system info is unavailable.
    pub default_height: u32,
    /// Color that transparent pixels are flattened onto for JPEG.
    pub jpeg_background: Color,
    /// Largest source region or output image, in pixels, an export accepts.
    pub max_export_pixels: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("minihost"),
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
            jpeg_background: Color::WHITE,
            max_export_pixels: DEFAULT_MAX_EXPORT_PIXELS,
        }
    }
}

impl HostConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Io`] if the file cannot be read, or
    /// [`CanvasError::Config`] if it is not valid configuration JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| CanvasError::Config(format!("{}: {e}", path.display())))
    }

    /// Override the temp directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }
}
