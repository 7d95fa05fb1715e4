//! `qbank.toml`: defaults shared by every subcommand.
//!
//! ```toml
//! [paths]
//! public_dir = "personal-dashboard/public"
//!
//! [detect]
//! padding = 20
//! x_margin = 20
//! ink = { threshold = 240 }
//! blocks = { gap_threshold = 40, min_block_height = 50, skip_top = 80 }
//!
//! [render]
//! scale = 2.0
//! clip_dpi = 150
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use qbank_core::PathConfig;
use qbank_raster::{BlockScanOptions, DEFAULT_SCALE, InkClassifier};
use serde::Deserialize;
use tracing::debug;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "qbank.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub detect: DetectConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub public_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            public_dir: PathConfig::default().public_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectConfig {
    /// Padding around a detected bounding box, in pixels.
    pub padding: u32,
    /// Horizontal inset of full-width question crops.
    pub x_margin: u32,
    /// Ink test for bounding-box detection.
    pub ink: InkClassifier,
    /// Whitespace-gap segmentation.
    pub blocks: BlockScanOptions,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            padding: 20,
            x_margin: 20,
            ink: InkClassifier::for_bbox(),
            blocks: BlockScanOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Pixels per PDF point for full-page renders.
    pub scale: f32,
    /// Resolution of `[[clip]]` renders.
    pub clip_dpi: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            clip_dpi: 150.0,
        }
    }
}

impl Config {
    /// Read `explicit`, or `qbank.toml` in the working directory when it
    /// exists, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(format!("config file not found: {}", path.display()));
                }
                path.to_path_buf()
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !path.is_file() {
                    debug!("no {DEFAULT_CONFIG_FILE}, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let config: Config =
            toml::from_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn path_config(&self) -> PathConfig {
        PathConfig::new(&self.paths.public_dir)
    }
}
