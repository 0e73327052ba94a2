//! Camera capture configuration.
//!
//! The Seek sensors run at a fixed cadence; the configured frame rate only
//! sets the per-frame time budget the pipeline paces itself against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported sensor families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    /// Seek Compact / CompactXR.
    #[serde(alias = "seekcompact", alias = "compactxr")]
    Seek,
    /// Seek CompactPRO.
    #[serde(alias = "compactpro")]
    SeekPro,
}

impl CameraType {
    /// Tag used in config files and FFC profile names.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Seek => "seek",
            Self::SeekPro => "seekpro",
        }
    }

    /// Native sensor resolution after the driver strips metadata rows.
    pub fn native_dimensions(&self) -> (u32, u32) {
        match self {
            Self::Seek => (206, 156),
            Self::SeekPro => (320, 240),
        }
    }
}

impl Default for CameraType {
    fn default() -> Self {
        Self::SeekPro
    }
}

impl fmt::Display for CameraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for CameraType {
    type Err = CaptureConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "seek" | "seekcompact" | "compactxr" => Ok(Self::Seek),
            "seekpro" | "compactpro" => Ok(Self::SeekPro),
            other => Err(CaptureConfigError::UnsupportedCamera(other.to_string())),
        }
    }
}

/// Configuration for frame capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Sensor family to open.
    pub camera_type: CameraType,
    /// Frame width in pixels (synthetic source only; hardware reports its own).
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second; sets the per-frame time budget.
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let camera_type = CameraType::Seek;
        let (width, height) = camera_type.native_dimensions();
        Self {
            camera_type,
            width,
            height,
            fps: 9,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Creates a configuration sized for the given camera.
    pub fn for_camera(camera_type: CameraType) -> Self {
        let (width, height) = camera_type.native_dimensions();
        Self {
            camera_type,
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), CaptureConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 60 {
            return Err(CaptureConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Capture configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-60 fps)")]
    InvalidFrameRate,
    #[error("unsupported camera type: {0:?}")]
    UnsupportedCamera(String),
}
