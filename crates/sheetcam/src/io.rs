//! JSON configuration for the service and the CLI.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use sheetcam_aruco::MarkerDetectorParams;
use sheetcam_capture::DeviceConfig;
use sheetcam_postprocess::PostProcessParams;
use sheetcam_rectify::RectifierParams;

use crate::ImageFormat;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Everything the pipeline needs, with defaults for every field so partial
/// files work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetcamConfig {
    pub device: DeviceConfig,
    pub detector: MarkerDetectorParams,
    pub rectifier: RectifierParams,
    pub postprocess: PostProcessParams,
    /// Encoding of raw camera frames.
    pub raw_format: ImageFormat,
    /// Encoding of rectified frames.
    pub rectified_format: ImageFormat,
}

impl Default for SheetcamConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            detector: MarkerDetectorParams::default(),
            rectifier: RectifierParams::default(),
            postprocess: PostProcessParams::default(),
            raw_format: ImageFormat::jpeg(),
            rectified_format: ImageFormat::Png,
        }
    }
}

impl SheetcamConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
