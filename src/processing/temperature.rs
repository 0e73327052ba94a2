//! Raw counts to calibrated temperatures.
//!
//! Seek sensors report counts roughly linear in scene radiance over the
//! handheld range. A fixed scale/offset maps counts to Kelvin; flat-field
//! correction, when a matching profile is loaded, is applied in count space
//! before that mapping.

use crate::calibration::{CalibrationMismatch, FfcProfile};
use crate::capture::{CameraType, RawFrame};
use serde::{Deserialize, Serialize};

const KELVIN_OFFSET: f32 = 273.15;

/// Display unit for temperatures. Values are always stored in Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Converts a Celsius value to this unit.
    pub fn from_celsius(&self, celsius: f32) -> f32 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Converts a value in this unit to Celsius.
    pub fn to_celsius(&self, value: f32) -> f32 {
        match self {
            Self::Celsius => value,
            Self::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    /// Converts a Celsius temperature difference to this unit.
    pub fn delta_from_celsius(&self, delta: f32) -> f32 {
        match self {
            Self::Celsius => delta,
            Self::Fahrenheit => delta * 9.0 / 5.0,
        }
    }

    /// Threshold adjustment step, in this unit.
    pub fn step(&self) -> f32 {
        match self {
            Self::Celsius => 0.5,
            Self::Fahrenheit => 1.0,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }
}

/// Temperature range used to normalize a frame for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempRange {
    pub min: f32,
    pub max: f32,
}

impl TempRange {
    /// Range spanned by `temps`, or `None` when empty.
    pub fn of(temps: &[f32]) -> Option<Self> {
        let mut iter = temps.iter().copied();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        Some(Self { min, max })
    }

    /// Maps `celsius` into `[0, 255]`. A degenerate range maps to 0.
    #[inline]
    pub fn normalize(&self, celsius: f32) -> u8 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0;
        }
        ((celsius - self.min) / span * 255.0).clamp(0.0, 255.0) as u8
    }
}

/// A frame of Celsius temperatures, same shape as its source frame.
#[derive(Debug, Clone)]
pub struct CalibratedFrame {
    temps: Vec<f32>,
    width: u32,
    height: u32,
    range: TempRange,
    locked: bool,
}

impl CalibratedFrame {
    /// Builds an auto-ranged frame directly from temperatures.
    ///
    /// Returns `None` if `temps` does not hold `width * height` values or
    /// is empty.
    pub fn from_celsius(temps: Vec<f32>, width: u32, height: u32) -> Option<Self> {
        if temps.len() != (width as usize) * (height as usize) {
            return None;
        }
        let range = TempRange::of(&temps)?;
        Some(Self {
            temps,
            width,
            height,
            range,
            locked: false,
        })
    }

    #[inline]
    pub fn temps(&self) -> &[f32] {
        &self.temps
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Range used to normalize this frame for display.
    pub fn display_range(&self) -> TempRange {
        self.range
    }

    /// True when the display range is the frozen exposure-lock range.
    pub fn is_range_locked(&self) -> bool {
        self.locked
    }

    /// Temperature at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.temps
            .get((y as usize) * (self.width as usize) + x as usize)
            .copied()
    }

    /// Pixel coordinates for a row-major index.
    #[inline]
    pub fn coords(&self, index: usize) -> (u32, u32) {
        let w = self.width.max(1) as usize;
        ((index % w) as u32, (index / w) as u32)
    }
}

/// Linear counts-to-Kelvin model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    /// Kelvin per count.
    pub scale: f32,
    /// Subtracted after scaling to land in Celsius.
    pub offset: f32,
}

impl Default for LinearModel {
    fn default() -> Self {
        Self {
            scale: 0.04,
            offset: KELVIN_OFFSET,
        }
    }
}

impl LinearModel {
    #[inline]
    pub fn to_celsius(&self, counts: f32) -> f32 {
        counts * self.scale - self.offset
    }

    /// Inverse of [`to_celsius`](Self::to_celsius), saturating to `u16`.
    pub fn to_counts(&self, celsius: f32) -> u16 {
        ((celsius + self.offset) / self.scale)
            .round()
            .clamp(0.0, u16::MAX as f32) as u16
    }
}

/// Result of converting one frame.
#[derive(Debug)]
pub struct Conversion {
    pub frame: CalibratedFrame,
    /// Set when a loaded profile could not be applied to this frame.
    pub mismatch: Option<CalibrationMismatch>,
}

/// Converts raw frames to calibrated temperature frames.
///
/// Owns the active flat-field profile and the exposure-lock reference
/// range. Both survive across frames; everything else is per call.
#[derive(Debug)]
pub struct TemperatureConverter {
    model: LinearModel,
    camera_type: CameraType,
    profile: Option<FfcProfile>,
    locked_range: Option<TempRange>,
}

impl TemperatureConverter {
    pub fn new(camera_type: CameraType) -> Self {
        Self::with_model(camera_type, LinearModel::default())
    }

    pub fn with_model(camera_type: CameraType, model: LinearModel) -> Self {
        Self {
            model,
            camera_type,
            profile: None,
            locked_range: None,
        }
    }

    /// Installs a flat-field profile, replacing any previous one.
    ///
    /// Profiles tagged for another camera are rejected and the current
    /// profile stays in place. Dimensions are checked per frame.
    pub fn set_profile(&mut self, profile: FfcProfile) -> Result<(), CalibrationMismatch> {
        if profile.camera_type() != self.camera_type {
            return Err(CalibrationMismatch::CameraType {
                profile: profile.camera_type(),
                active: self.camera_type,
            });
        }
        tracing::info!(
            path = ?profile.path(),
            captured_at = %profile.captured_at(),
            "Flat-field profile installed"
        );
        self.profile = Some(profile);
        Ok(())
    }

    pub fn profile(&self) -> Option<&FfcProfile> {
        self.profile.as_ref()
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    /// The frozen exposure range, if the lock has captured one.
    pub fn locked_range(&self) -> Option<TempRange> {
        self.locked_range
    }

    /// Converts a raw frame.
    ///
    /// With `exposure_lock` set, the first frame converted captures its own
    /// range as the frozen reference and later frames reuse it. Clearing the
    /// lock discards the reference.
    pub fn convert(&mut self, frame: &RawFrame, exposure_lock: bool) -> Conversion {
        let mut mismatch = None;
        let profile = match &self.profile {
            Some(profile) => match profile.check(self.camera_type, frame.dimensions()) {
                Ok(()) => Some(profile),
                Err(err) => {
                    mismatch = Some(err);
                    None
                }
            },
            None => None,
        };

        let model = self.model;
        let temps: Vec<f32> = match profile {
            Some(profile) => frame
                .counts()
                .iter()
                .enumerate()
                .map(|(i, &raw)| model.to_celsius(profile.correct(i, raw)))
                .collect(),
            None => frame
                .counts()
                .iter()
                .map(|&raw| model.to_celsius(raw as f32))
                .collect(),
        };

        let auto = TempRange::of(&temps).unwrap_or(TempRange { min: 0.0, max: 0.0 });
        let (range, locked) = if exposure_lock {
            let range = *self.locked_range.get_or_insert_with(|| {
                tracing::debug!(min = auto.min, max = auto.max, "Exposure range locked");
                auto
            });
            (range, true)
        } else {
            self.locked_range = None;
            (auto, false)
        };

        Conversion {
            frame: CalibratedFrame {
                temps,
                width: frame.width(),
                height: frame.height(),
                range,
                locked,
            },
            mismatch,
        }
    }
}
