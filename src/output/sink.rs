//! Display sinks.

use image::{imageops, imageops::FilterType, RgbImage};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while presenting a frame.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("display not ready: {0}")]
    DeviceNotReady(String),
    #[error("display write timed out")]
    WriteTimeout,
    #[error("display I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Destination for finished frames.
pub trait FrameSink {
    /// Presents one frame.
    fn push(&mut self, image: &RgbImage) -> Result<(), SinkError>;

    /// Releases the display. Further pushes fail.
    fn close(&mut self);
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn push(&mut self, image: &RgbImage) -> Result<(), SinkError> {
        (**self).push(image)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Sink that keeps the last frame in memory.
#[derive(Debug, Default)]
pub struct NullSink {
    last: Option<RgbImage>,
    pushed: u64,
    failures_left: u32,
    closed: bool,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` pushes fail with `DeviceNotReady`.
    pub fn fail_next(&mut self, count: u32) -> &mut Self {
        self.failures_left = count;
        self
    }

    pub fn last_frame(&self) -> Option<&RgbImage> {
        self.last.as_ref()
    }

    /// Frames accepted so far.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameSink for NullSink {
    fn push(&mut self, image: &RgbImage) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::DeviceNotReady("sink closed".to_string()));
        }
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(SinkError::DeviceNotReady("injected failure".to_string()));
        }
        self.last = Some(image.clone());
        self.pushed += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Linux framebuffer sink for small SPI panels such as the Waveshare 2.4"
/// ST7789, exposed as an RGB565 `/dev/fbN` device.
///
/// Frames are scaled to fit the panel, centered on black.
#[derive(Debug)]
pub struct FramebufferSink {
    path: PathBuf,
    device: Option<File>,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl FramebufferSink {
    /// Opens the framebuffer device for writing.
    pub fn open(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if width == 0 || height == 0 {
            return Err(SinkError::DeviceNotReady(format!(
                "invalid panel size {width}x{height}"
            )));
        }
        let device = OpenOptions::new().write(true).open(&path).map_err(|e| {
            SinkError::DeviceNotReady(format!("{}: {}", path.display(), e))
        })?;
        tracing::info!(device = %path.display(), width, height, "Framebuffer opened");
        Ok(Self {
            path,
            device: Some(device),
            width,
            height,
            buffer: Vec::with_capacity((width * height * 2) as usize),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Scales `image` to fit the panel, letterboxed.
    fn fit(&self, image: &RgbImage) -> RgbImage {
        if image.dimensions() == (self.width, self.height) {
            return image.clone();
        }
        let (iw, ih) = image.dimensions();
        let scale =
            (self.width as f32 / iw.max(1) as f32).min(self.height as f32 / ih.max(1) as f32);
        let w = ((iw as f32 * scale).round() as u32).clamp(1, self.width);
        let h = ((ih as f32 * scale).round() as u32).clamp(1, self.height);
        let resized = imageops::resize(image, w, h, FilterType::Triangle);

        let mut canvas = RgbImage::new(self.width, self.height);
        let x = ((self.width - w) / 2) as i64;
        let y = ((self.height - h) / 2) as i64;
        imageops::overlay(&mut canvas, &resized, x, y);
        canvas
    }
}

/// Packs an RGB888 pixel into little-endian RGB565.
#[inline]
pub fn rgb565(rgb: [u8; 3]) -> [u8; 2] {
    let [r, g, b] = rgb;
    let packed = ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3);
    packed.to_le_bytes()
}

impl FrameSink for FramebufferSink {
    fn push(&mut self, image: &RgbImage) -> Result<(), SinkError> {
        let fitted = self.fit(image);
        self.buffer.clear();
        for px in fitted.pixels() {
            self.buffer.extend_from_slice(&rgb565(px.0));
        }

        let device = self
            .device
            .as_mut()
            .ok_or_else(|| SinkError::DeviceNotReady("framebuffer closed".to_string()))?;
        device.seek(SeekFrom::Start(0))?;
        device.write_all(&self.buffer).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => SinkError::WriteTimeout,
            _ => SinkError::Io(e),
        })?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            // Blank the panel on the way out.
            let blank = vec![0u8; (self.width * self.height * 2) as usize];
            let cleared = device
                .seek(SeekFrom::Start(0))
                .and_then(|_| device.write_all(&blank));
            if let Err(e) = cleared {
                tracing::debug!(error = %e, "Could not blank framebuffer");
            }
            tracing::info!(device = %self.path.display(), "Framebuffer closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_rgb565_packing() {
        assert_eq!(rgb565([255, 255, 255]), [0xFF, 0xFF]);
        assert_eq!(rgb565([255, 0, 0]), [0x00, 0xF8]);
        assert_eq!(rgb565([0, 0, 255]), [0x1F, 0x00]);
    }

    #[test]
    fn test_null_sink_keeps_last_frame() {
        let mut sink = NullSink::new();
        sink.push(&RgbImage::new(3, 2)).unwrap();
        sink.push(&RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]))).unwrap();
        assert_eq!(sink.pushed(), 2);
        assert_eq!(sink.last_frame().unwrap().get_pixel(0, 0).0, [1, 2, 3]);

        sink.close();
        assert!(sink.push(&RgbImage::new(3, 2)).is_err());
    }

    #[test]
    fn test_null_sink_injected_failures() {
        let mut sink = NullSink::new();
        sink.fail_next(1);
        assert!(matches!(
            sink.push(&RgbImage::new(1, 1)),
            Err(SinkError::DeviceNotReady(_))
        ));
        assert!(sink.push(&RgbImage::new(1, 1)).is_ok());
    }

    #[test]
    fn test_framebuffer_writes_letterboxed_rgb565() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut sink = FramebufferSink::open(file.path(), 8, 8).unwrap();

        sink.push(&RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]))).unwrap();
        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(bytes.len(), 8 * 8 * 2);
        // Top row is letterbox, center row is image.
        assert_eq!(&bytes[0..2], &[0, 0]);
        let center = (4 * 8 + 4) * 2;
        assert_eq!(&bytes[center..center + 2], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_framebuffer_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let err = FramebufferSink::open(dir.path().join("fb9"), 240, 320).unwrap_err();
        assert!(matches!(err, SinkError::DeviceNotReady(_)));
    }
}
