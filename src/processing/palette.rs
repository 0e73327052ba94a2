//! Color palettes for thermal display.
//!
//! Each palette is a piecewise-linear gradient through a handful of RGB
//! stops, approximating the OpenCV/matplotlib colormap of the same name.
//! A 256-entry lookup table is built per call and applied to the frame
//! normalized by its display range.

use super::CalibratedFrame;
use image::{Rgb, RgbImage};

/// Number of selectable palettes.
pub const PALETTE_COUNT: usize = 22;

type Stop = (f32, [u8; 3]);

/// A named color transfer function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Palette {
    Gray,
    Autumn,
    Bone,
    Jet,
    Winter,
    Rainbow,
    Ocean,
    Summer,
    Spring,
    Cool,
    Hsv,
    Pink,
    Hot,
    Parula,
    Magma,
    Inferno,
    Plasma,
    Viridis,
    Cividis,
    Twilight,
    TwilightShifted,
    Turbo,
}

impl Palette {
    /// All palettes in selection order.
    pub const ALL: [Palette; PALETTE_COUNT] = [
        Self::Gray,
        Self::Autumn,
        Self::Bone,
        Self::Jet,
        Self::Winter,
        Self::Rainbow,
        Self::Ocean,
        Self::Summer,
        Self::Spring,
        Self::Cool,
        Self::Hsv,
        Self::Pink,
        Self::Hot,
        Self::Parula,
        Self::Magma,
        Self::Inferno,
        Self::Plasma,
        Self::Viridis,
        Self::Cividis,
        Self::Twilight,
        Self::TwilightShifted,
        Self::Turbo,
    ];

    /// Palette at `index`, or `None` outside `[0, 21]`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Palette at `index` wrapped modulo the palette count.
    pub fn wrapping(index: usize) -> Self {
        Self::ALL[index % PALETTE_COUNT]
    }

    /// Looks a palette up by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gray => "GRAY",
            Self::Autumn => "AUTUMN",
            Self::Bone => "BONE",
            Self::Jet => "JET",
            Self::Winter => "WINTER",
            Self::Rainbow => "RAINBOW",
            Self::Ocean => "OCEAN",
            Self::Summer => "SUMMER",
            Self::Spring => "SPRING",
            Self::Cool => "COOL",
            Self::Hsv => "HSV",
            Self::Pink => "PINK",
            Self::Hot => "HOT",
            Self::Parula => "PARULA",
            Self::Magma => "MAGMA",
            Self::Inferno => "INFERNO",
            Self::Plasma => "PLASMA",
            Self::Viridis => "VIRIDIS",
            Self::Cividis => "CIVIDIS",
            Self::Twilight => "TWILIGHT",
            Self::TwilightShifted => "TWILIGHT_SHIFTED",
            Self::Turbo => "TURBO",
        }
    }

    fn stops(&self) -> &'static [Stop] {
        match self {
            Self::Gray => &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])],
            Self::Autumn => &[(0.0, [255, 0, 0]), (1.0, [255, 255, 0])],
            Self::Bone => &[
                (0.0, [0, 0, 0]),
                (0.375, [81, 81, 113]),
                (0.75, [166, 198, 198]),
                (1.0, [255, 255, 255]),
            ],
            Self::Jet => &[
                (0.0, [0, 0, 128]),
                (0.125, [0, 0, 255]),
                (0.375, [0, 255, 255]),
                (0.625, [255, 255, 0]),
                (0.875, [255, 0, 0]),
                (1.0, [128, 0, 0]),
            ],
            Self::Winter => &[(0.0, [0, 0, 255]), (1.0, [0, 255, 128])],
            Self::Rainbow => &[
                (0.0, [255, 0, 0]),
                (0.2, [255, 255, 0]),
                (0.4, [0, 255, 0]),
                (0.6, [0, 255, 255]),
                (0.8, [0, 0, 255]),
                (1.0, [128, 0, 255]),
            ],
            Self::Ocean => &[
                (0.0, [0, 128, 0]),
                (0.333, [0, 0, 85]),
                (0.667, [0, 128, 170]),
                (1.0, [255, 255, 255]),
            ],
            Self::Summer => &[(0.0, [0, 128, 102]), (1.0, [255, 255, 102])],
            Self::Spring => &[(0.0, [255, 0, 255]), (1.0, [255, 255, 0])],
            Self::Cool => &[(0.0, [0, 255, 255]), (1.0, [255, 0, 255])],
            Self::Hsv => &[
                (0.0, [255, 0, 0]),
                (0.167, [255, 255, 0]),
                (0.333, [0, 255, 0]),
                (0.5, [0, 255, 255]),
                (0.667, [0, 0, 255]),
                (0.833, [255, 0, 255]),
                (1.0, [255, 0, 0]),
            ],
            Self::Pink => &[
                (0.0, [30, 0, 0]),
                (0.25, [147, 96, 96]),
                (0.5, [198, 160, 139]),
                (0.75, [222, 222, 177]),
                (1.0, [255, 255, 255]),
            ],
            Self::Hot => &[
                (0.0, [11, 0, 0]),
                (0.375, [255, 0, 0]),
                (0.75, [255, 255, 0]),
                (1.0, [255, 255, 255]),
            ],
            Self::Parula => &[
                (0.0, [53, 42, 135]),
                (0.25, [18, 125, 216]),
                (0.5, [55, 184, 157]),
                (0.75, [209, 187, 89]),
                (1.0, [249, 251, 14]),
            ],
            Self::Magma => &[
                (0.0, [0, 0, 4]),
                (0.25, [81, 18, 124]),
                (0.5, [183, 55, 121]),
                (0.75, [252, 137, 97]),
                (1.0, [252, 253, 191]),
            ],
            Self::Inferno => &[
                (0.0, [0, 0, 4]),
                (0.25, [87, 16, 110]),
                (0.5, [188, 55, 84]),
                (0.75, [249, 142, 9]),
                (1.0, [252, 255, 164]),
            ],
            Self::Plasma => &[
                (0.0, [13, 8, 135]),
                (0.25, [126, 3, 168]),
                (0.5, [204, 71, 120]),
                (0.75, [248, 149, 64]),
                (1.0, [240, 249, 33]),
            ],
            Self::Viridis => &[
                (0.0, [68, 1, 84]),
                (0.25, [59, 82, 139]),
                (0.5, [33, 145, 140]),
                (0.75, [94, 201, 98]),
                (1.0, [253, 231, 37]),
            ],
            Self::Cividis => &[
                (0.0, [0, 34, 78]),
                (0.25, [65, 77, 108]),
                (0.5, [124, 123, 120]),
                (0.75, [188, 175, 111]),
                (1.0, [255, 234, 70]),
            ],
            Self::Twilight => &[
                (0.0, [226, 217, 226]),
                (0.25, [94, 129, 186]),
                (0.5, [47, 20, 55]),
                (0.75, [178, 86, 76]),
                (1.0, [226, 217, 226]),
            ],
            Self::TwilightShifted => &[
                (0.0, [47, 20, 55]),
                (0.25, [94, 129, 186]),
                (0.5, [226, 217, 226]),
                (0.75, [178, 86, 76]),
                (1.0, [47, 20, 55]),
            ],
            Self::Turbo => &[
                (0.0, [48, 18, 59]),
                (0.15, [67, 127, 245]),
                (0.3, [31, 205, 212]),
                (0.45, [98, 252, 107]),
                (0.6, [206, 236, 52]),
                (0.75, [254, 155, 45]),
                (0.9, [218, 57, 7]),
                (1.0, [122, 4, 3]),
            ],
        }
    }

    /// Builds the 256-entry lookup table.
    pub fn lut(&self) -> [[u8; 3]; 256] {
        let stops = self.stops();
        let mut lut = [[0u8; 3]; 256];
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = interpolate(stops, i as f32 / 255.0);
        }
        lut
    }

    /// Color for a normalized intensity.
    pub fn color(&self, value: u8) -> [u8; 3] {
        interpolate(self.stops(), value as f32 / 255.0)
    }

    /// Maps a calibrated frame to an RGB image of the same dimensions.
    pub fn apply(&self, frame: &CalibratedFrame) -> RgbImage {
        let lut = self.lut();
        let range = frame.display_range();
        RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
            let value = frame.get(x, y).map_or(0, |t| range.normalize(t));
            Rgb(lut[value as usize])
        })
    }
}

fn interpolate(stops: &[Stop], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let upper = stops
        .iter()
        .position(|&(pos, _)| pos >= t)
        .unwrap_or(stops.len() - 1);
    if upper == 0 {
        return stops[0].1;
    }
    let (p0, c0) = stops[upper - 1];
    let (p1, c1) = stops[upper];
    let span = p1 - p0;
    let f = if span > 0.0 { (t - p0) / span } else { 0.0 };
    let mut out = [0u8; 3];
    for ch in 0..3 {
        let v = c0[ch] as f32 + (c1[ch] as f32 - c0[ch] as f32) * f;
        out[ch] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CameraType, RawFrame};
    use crate::processing::TemperatureConverter;
    use proptest::prelude::*;

    #[test]
    fn test_twenty_two_palettes_indexed_in_order() {
        assert_eq!(Palette::ALL.len(), 22);
        for (i, p) in Palette::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
            assert_eq!(Palette::from_index(i), Some(*p));
        }
        assert_eq!(Palette::from_index(22), None);
        assert_eq!(Palette::wrapping(23), Palette::Autumn);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Palette::from_name("turbo"), Some(Palette::Turbo));
        assert_eq!(Palette::from_name("TWILIGHT_SHIFTED"), Some(Palette::TwilightShifted));
        assert_eq!(Palette::from_name("ironbow"), None);
    }

    #[test]
    fn test_gray_endpoints() {
        let lut = Palette::Gray.lut();
        assert_eq!(lut[0], [0, 0, 0]);
        assert_eq!(lut[255], [255, 255, 255]);
        assert_eq!(lut[128], [128, 128, 128]);
    }

    #[test]
    fn test_stops_cover_unit_interval() {
        for p in Palette::ALL {
            let stops = p.stops();
            assert_eq!(stops.first().map(|s| s.0), Some(0.0), "{}", p.name());
            assert_eq!(stops.last().map(|s| s.0), Some(1.0), "{}", p.name());
        }
    }

    #[test]
    fn test_flat_frame_maps_to_first_entry() {
        let frame = CalibratedFrame::from_celsius(vec![21.0; 6], 3, 2).unwrap();
        let image = Palette::Hot.apply(&frame);
        let first = Palette::Hot.lut()[0];
        assert!(image.pixels().all(|p| p.0 == first));
    }

    #[test]
    fn test_short_frame_fills_missing_pixels() {
        let raw = RawFrame::new(vec![7600; 10], 8, 6, 1);
        let frame = TemperatureConverter::new(CameraType::Seek)
            .convert(&raw, false)
            .frame;
        let image = Palette::Gray.apply(&frame);
        assert_eq!(image.dimensions(), (8, 6));
        assert_eq!(image.get_pixel(7, 5).0, Palette::Gray.lut()[0]);
    }

    proptest! {
        #[test]
        fn prop_output_matches_input_shape(
            temps in prop::collection::vec(-20.0f32..150.0, 1..64),
            index in 0usize..PALETTE_COUNT,
        ) {
            let width = temps.len() as u32;
            let frame = CalibratedFrame::from_celsius(temps, width, 1).unwrap();
            let image = Palette::ALL[index].apply(&frame);

            prop_assert_eq!(image.width(), frame.width());
            prop_assert_eq!(image.height(), frame.height());
            prop_assert_eq!(image.pixels().count(), frame.temps().len());
            // Channels are u8, so [0, 255] holds by construction; the buffer
            // must carry exactly three channels per pixel.
            prop_assert_eq!(image.as_raw().len(), frame.temps().len() * 3);
        }
    }
}
