//! Raw sensor frame with capture metadata.

use std::time::Instant;

/// A single raw frame read from the thermal sensor.
///
/// Holds unsigned 16-bit sensor counts in row-major order. Frames are
/// immutable once built; the pipeline step processing a frame owns it and
/// drops it when the iteration ends.
#[derive(Clone)]
pub struct RawFrame {
    /// Raw sensor counts, row-major.
    counts: Vec<u16>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number assigned by the source.
    sequence: u64,
}

impl RawFrame {
    /// Creates a new frame with the given parameters.
    pub fn new(counts: Vec<u16>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            counts,
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Creates a frame where every pixel holds `value`.
    pub fn uniform(value: u16, width: u32, height: u32, sequence: u64) -> Self {
        let count = (width as usize) * (height as usize);
        Self::new(vec![value; count], width, height, sequence)
    }

    /// Creates a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: u32,
        height: u32,
        sequence: u64,
        mut f: impl FnMut(u32, u32) -> u16,
    ) -> Self {
        let mut counts = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                counts.push(f(x, y));
            }
        }
        Self::new(counts, width, height, sequence)
    }

    /// Returns the raw counts.
    #[inline]
    pub fn counts(&self) -> &[u16] {
        &self.counts
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns the count at `(x, y)`, or `None` outside the frame.
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.counts
            .get((y as usize) * (self.width as usize) + x as usize)
            .copied()
    }

    /// Validates that the count buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.counts.len() == self.pixel_count()
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixels", &self.counts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = RawFrame::new(vec![0u16; 206 * 156], 206, 156, 1);

        assert_eq!(frame.width(), 206);
        assert_eq!(frame.height(), 156);
        assert_eq!(frame.sequence(), 1);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let frame = RawFrame::new(vec![0u16; 100], 206, 156, 1);
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let frame = RawFrame::from_fn(3, 2, 0, |x, y| (y * 10 + x) as u16);

        assert_eq!(frame.counts(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(frame.get(2, 1), Some(12));
        assert_eq!(frame.get(3, 0), None);
    }
}
