//! Hot and cold spot detection.

use super::{CalibratedFrame, TemperatureUnit};

/// Tint for the hottest pixel set.
pub const HOT_SPOT_COLOR: [u8; 3] = [255, 140, 0];
/// Tint for the coldest pixel set.
pub const COLD_SPOT_COLOR: [u8; 3] = [0, 136, 255];

/// A single pixel and its temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spot {
    pub x: u32,
    pub y: u32,
    /// Temperature in Celsius.
    pub celsius: f32,
}

/// Extreme-percentile pixel sets and extrema of one frame.
#[derive(Debug, Clone)]
pub struct HotColdReport {
    /// Row-major indices of the hottest pixels.
    pub hot: Vec<usize>,
    /// Row-major indices of the coldest pixels.
    pub cold: Vec<usize>,
    pub max: Spot,
    pub min: Spot,
}

impl HotColdReport {
    /// `max - min` in Celsius.
    pub fn delta_celsius(&self) -> f32 {
        self.max.celsius - self.min.celsius
    }

    /// `max - min` expressed in `unit`.
    pub fn delta_in(&self, unit: TemperatureUnit) -> f32 {
        unit.delta_from_celsius(self.delta_celsius())
    }
}

/// Finds the hottest and coldest `percent` of pixels.
#[derive(Debug, Clone, Copy)]
pub struct HotColdDetector {
    percent: u32,
}

impl Default for HotColdDetector {
    fn default() -> Self {
        Self { percent: 2 }
    }
}

impl HotColdDetector {
    pub fn with_percent(percent: u32) -> Self {
        Self {
            percent: percent.min(50),
        }
    }

    /// Pixels per extreme set: `floor(n * percent / 100)`.
    pub fn set_size(&self, pixel_count: usize) -> usize {
        pixel_count * self.percent as usize / 100
    }

    /// Returns extrema and extreme sets, or `None` for an empty frame.
    pub fn detect(&self, frame: &CalibratedFrame) -> Option<HotColdReport> {
        let temps = frame.temps();
        let (min, max) = extrema(frame)?;

        let k = self.set_size(temps.len());
        let mut hot: Vec<usize> = (0..temps.len()).collect();
        let mut cold = hot.clone();
        if k > 0 {
            hot.select_nth_unstable_by(k - 1, |&a, &b| temps[b].total_cmp(&temps[a]));
            cold.select_nth_unstable_by(k - 1, |&a, &b| temps[a].total_cmp(&temps[b]));
        }
        hot.truncate(k);
        cold.truncate(k);

        Some(HotColdReport { hot, cold, max, min })
    }
}

/// Coldest and hottest pixels, first occurrence on ties.
pub fn extrema(frame: &CalibratedFrame) -> Option<(Spot, Spot)> {
    let temps = frame.temps();
    let first = *temps.first()?;
    let (mut lo, mut hi) = ((0usize, first), (0usize, first));
    for (i, &t) in temps.iter().enumerate().skip(1) {
        if t < lo.1 {
            lo = (i, t);
        }
        if t > hi.1 {
            hi = (i, t);
        }
    }
    let spot = |(i, celsius): (usize, f32)| {
        let (x, y) = frame.coords(i);
        Spot { x, y, celsius }
    };
    Some((spot(lo), spot(hi)))
}
