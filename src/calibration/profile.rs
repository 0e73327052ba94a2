//! Flat-field correction profile.
//!
//! A profile is the per-pixel mean of a run of frames taken against a
//! uniform scene (lens cap on). Each pixel's deviation from the global
//! mean is the sensor's fixed-pattern non-uniformity, which the profile
//! divides back out.

use crate::capture::CameraType;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A loaded profile that cannot be applied to the current camera or frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibrationMismatch {
    #[error("profile is for camera {profile}, active camera is {active}")]
    CameraType {
        profile: CameraType,
        active: CameraType,
    },
    #[error("profile is {profile:?}, frame is {frame:?}")]
    Dimensions {
        profile: (u32, u32),
        frame: (u32, u32),
    },
}

/// Per-pixel offset/gain correction derived from a flat field.
#[derive(Debug, Clone)]
pub struct FfcProfile {
    camera_type: CameraType,
    captured_at: DateTime<Local>,
    path: Option<PathBuf>,
    width: u32,
    height: u32,
    /// Flat-field mean counts per pixel, as stored on disk.
    mean: Vec<u16>,
    offset: Vec<f32>,
    gain: Vec<f32>,
    reference: f32,
}

impl FfcProfile {
    /// Builds a profile from the per-pixel flat-field mean.
    ///
    /// Returns `None` if `mean` does not hold `width * height` values.
    pub fn from_mean(
        mean: Vec<u16>,
        width: u32,
        height: u32,
        camera_type: CameraType,
        captured_at: DateTime<Local>,
    ) -> Option<Self> {
        let pixel_count = (width as usize) * (height as usize);
        if pixel_count == 0 || mean.len() != pixel_count {
            return None;
        }

        let sum: f64 = mean.iter().map(|&m| m as f64).sum();
        let reference = (sum / pixel_count as f64) as f32;

        // Dead pixels (mean 0) pass raw counts through unchanged.
        let (offset, gain) = mean
            .iter()
            .map(|&m| {
                if m == 0 {
                    (reference, 1.0)
                } else {
                    (m as f32, reference / m as f32)
                }
            })
            .unzip();

        Some(Self {
            camera_type,
            captured_at,
            path: None,
            width,
            height,
            mean,
            offset,
            gain,
            reference,
        })
    }

    /// Records where the profile was persisted.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Checks the profile against the active camera and frame size.
    pub fn check(
        &self,
        camera_type: CameraType,
        dimensions: (u32, u32),
    ) -> Result<(), CalibrationMismatch> {
        if self.camera_type != camera_type {
            return Err(CalibrationMismatch::CameraType {
                profile: self.camera_type,
                active: camera_type,
            });
        }
        if self.dimensions() != dimensions {
            return Err(CalibrationMismatch::Dimensions {
                profile: self.dimensions(),
                frame: dimensions,
            });
        }
        Ok(())
    }

    /// Corrects one raw count at pixel `index`: `(raw - offset) * gain + reference`.
    #[inline]
    pub fn correct(&self, index: usize, raw: u16) -> f32 {
        (raw as f32 - self.offset[index]) * self.gain[index] + self.reference
    }

    /// Global mean of the flat field; a flat scene corrects to this count.
    pub fn reference(&self) -> f32 {
        self.reference
    }

    pub fn camera_type(&self) -> CameraType {
        self.camera_type
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Flat-field mean counts, row-major.
    pub fn mean(&self) -> &[u16] {
        &self.mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(mean: Vec<u16>, w: u32, h: u32) -> FfcProfile {
        FfcProfile::from_mean(mean, w, h, CameraType::Seek, Local::now()).unwrap()
    }

    #[test]
    fn test_uniform_field_corrects_to_reference() {
        let p = profile(vec![8000; 4], 2, 2);
        assert_eq!(p.reference(), 8000.0);
        for i in 0..4 {
            assert_eq!(p.correct(i, 8000), 8000.0);
        }
    }

    #[test]
    fn test_fixed_pattern_is_flattened() {
        let mean = vec![7900, 8100, 8000, 8000];
        let p = profile(mean.clone(), 2, 2);

        // Imaging the same flat scene again yields a uniform frame.
        for (i, &raw) in mean.iter().enumerate() {
            assert!((p.correct(i, raw) - p.reference()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_dead_pixel_passes_through() {
        let p = profile(vec![0, 8000, 8000, 8000], 2, 2);
        assert!((p.correct(0, 1234) - 1234.0).abs() < 1e-3);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let profile = FfcProfile::from_mean(vec![1, 2, 3], 2, 2, CameraType::Seek, Local::now());
        assert!(profile.is_none());
    }

    #[test]
    fn test_mismatch_detection() {
        let p = profile(vec![8000; 4], 2, 2);

        assert!(p.check(CameraType::Seek, (2, 2)).is_ok());
        assert!(matches!(
            p.check(CameraType::SeekPro, (2, 2)),
            Err(CalibrationMismatch::CameraType { .. })
        ));
        assert!(matches!(
            p.check(CameraType::Seek, (4, 4)),
            Err(CalibrationMismatch::Dimensions { .. })
        ));
    }
}
