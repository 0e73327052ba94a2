//! Threshold highlighting.
//!
//! Selects pixels above, below, or near a live temperature threshold and
//! tints them over the palette image.

use super::{CalibratedFrame, Spot};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Half-width of the band the equality comparator accepts, in Celsius.
pub const EQUALITY_EPSILON_C: f32 = 0.1;

/// Relational operator applied against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comparator {
    #[default]
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "=")]
    Equal,
}

impl Comparator {
    /// True when `celsius` satisfies this comparator against `threshold`.
    #[inline]
    pub fn matches(&self, celsius: f32, threshold: f32) -> bool {
        match self {
            Self::Greater => celsius > threshold,
            Self::Less => celsius < threshold,
            Self::Equal => (celsius - threshold).abs() <= EQUALITY_EPSILON_C,
        }
    }

    /// Next comparator in the `> < =` cycle.
    pub fn next(&self) -> Self {
        match self {
            Self::Greater => Self::Less,
            Self::Less => Self::Equal,
            Self::Equal => Self::Greater,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::Less => "<",
            Self::Equal => "=",
        }
    }

    /// Tint used for matched pixels.
    pub fn highlight_color(&self) -> [u8; 3] {
        match self {
            Self::Greater => [255, 0, 0],
            Self::Less => [0, 136, 255],
            Self::Equal => [255, 255, 255],
        }
    }
}

/// Pixels matching the threshold and the extreme matched pixels.
#[derive(Debug, Clone)]
pub struct ThresholdMatch {
    /// Row-major mask, same shape as the frame.
    pub mask: Vec<bool>,
    pub matched: usize,
    pub hottest: Option<Spot>,
    pub coldest: Option<Spot>,
}

impl ThresholdMatch {
    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }
}

/// Evaluates `comparator` against `threshold_c` for every pixel.
pub fn highlight(
    frame: &CalibratedFrame,
    threshold_c: f32,
    comparator: Comparator,
) -> ThresholdMatch {
    let mut mask = Vec::with_capacity(frame.temps().len());
    let mut matched = 0;
    let mut hottest: Option<(usize, f32)> = None;
    let mut coldest: Option<(usize, f32)> = None;

    for (i, &t) in frame.temps().iter().enumerate() {
        let hit = comparator.matches(t, threshold_c);
        mask.push(hit);
        if !hit {
            continue;
        }
        matched += 1;
        if hottest.map_or(true, |(_, h)| t > h) {
            hottest = Some((i, t));
        }
        if coldest.map_or(true, |(_, c)| t < c) {
            coldest = Some((i, t));
        }
    }

    let spot = |(i, celsius): (usize, f32)| {
        let (x, y) = frame.coords(i);
        Spot { x, y, celsius }
    };
    ThresholdMatch {
        mask,
        matched,
        hottest: hottest.map(spot),
        coldest: coldest.map(spot),
    }
}

/// Blends `color` into every masked pixel of `image`.
///
/// `alpha` is the tint weight in `[0, 1]`. Mask entries beyond the image
/// are ignored.
pub fn tint(image: &mut RgbImage, mask: &[bool], color: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    for (pixel, _) in image
        .pixels_mut()
        .zip(mask.iter())
        .filter(|(_, &hit)| hit)
    {
        for ch in 0..3 {
            let base = pixel.0[ch] as f32;
            pixel.0[ch] = (base + (color[ch] as f32 - base) * alpha).round() as u8;
        }
    }
}

/// Builds a mask from row-major indices.
pub fn mask_from_indices(len: usize, indices: &[usize]) -> Vec<bool> {
    let mut mask = vec![false; len];
    for &i in indices {
        if let Some(slot) = mask.get_mut(i) {
            *slot = true;
        }
    }
    mask
}
