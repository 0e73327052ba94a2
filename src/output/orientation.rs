//! Final image orientation.

use image::{imageops, RgbImage};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

#[derive(Debug, Clone, Error)]
#[error("rotation must be 0, 90, 180 or 270 degrees, got {0}")]
pub struct InvalidRotation(String);

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Self::None),
            90 => Some(Self::Quarter),
            180 => Some(Self::Half),
            270 => Some(Self::ThreeQuarter),
            _ => None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Quarter => 90,
            Self::Half => 180,
            Self::ThreeQuarter => 270,
        }
    }
}

impl FromStr for Rotation {
    type Err = InvalidRotation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_degrees)
            .ok_or_else(|| InvalidRotation(s.to_string()))
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

/// Rotation followed by an optional horizontal mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub rotation: Rotation,
    pub flip: bool,
}

impl Orientation {
    pub fn new(rotation: Rotation, flip: bool) -> Self {
        Self { rotation, flip }
    }

    pub fn is_identity(&self) -> bool {
        self.rotation == Rotation::None && !self.flip
    }

    /// Orients `image`. The identity orientation returns it untouched.
    pub fn apply(&self, image: RgbImage) -> RgbImage {
        let rotated = match self.rotation {
            Rotation::None => image,
            Rotation::Quarter => imageops::rotate90(&image),
            Rotation::Half => imageops::rotate180(&image),
            Rotation::ThreeQuarter => imageops::rotate270(&image),
        };
        if self.flip {
            imageops::flip_horizontal(&rotated)
        } else {
            rotated
        }
    }
}
