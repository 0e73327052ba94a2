//! Frame source abstraction.
//!
//! The physical Seek driver and its USB transport live outside this crate.
//! The pipeline only sees the [`FrameSource`] capability, which lets the
//! synthetic camera and scripted replays stand in for hardware.

use super::{CameraType, CaptureConfig, RawFrame};
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during frame source operations.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("camera device not found: {0}")]
    NotFound(String),
    #[error("camera busy")]
    Busy,
    #[error("camera pipe error: {0}")]
    Pipe(String),
    #[error("timed out waiting for frame")]
    Timeout,
    #[error("unsupported camera type: {0}")]
    UnsupportedType(String),
    #[error("camera not open")]
    NotOpen,
    #[error("malformed frame: {0}")]
    BadFrame(String),
}

/// Trait for frame source implementations.
pub trait FrameSource {
    /// Opens the camera and returns the fixed frame dimensions.
    ///
    /// `ffc_path` is handed to drivers that apply their own flat-field
    /// correction at the transport level.
    fn open(
        &mut self,
        camera_type: CameraType,
        ffc_path: Option<&Path>,
    ) -> Result<(u32, u32), SourceError>;

    /// Reads the next frame. Blocks at most for one sensor period.
    fn read(&mut self) -> Result<RawFrame, SourceError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn open(
        &mut self,
        camera_type: CameraType,
        ffc_path: Option<&Path>,
    ) -> Result<(u32, u32), SourceError> {
        (**self).open(camera_type, ffc_path)
    }

    fn read(&mut self) -> Result<RawFrame, SourceError> {
        (**self).read()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Synthetic camera producing a moving thermal scene.
///
/// A slow rotating gradient around room temperature with a warm blob
/// orbiting the centre. Deterministic, so it doubles as a test fixture.
#[derive(Debug)]
pub struct SyntheticCamera {
    config: CaptureConfig,
    open: bool,
    sequence: u64,
}

impl SyntheticCamera {
    /// Counts that map to roughly 20 degrees Celsius.
    const BASE_COUNTS: f32 = 7330.0;

    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            open: false,
            sequence: 0,
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn open(
        &mut self,
        camera_type: CameraType,
        ffc_path: Option<&Path>,
    ) -> Result<(u32, u32), SourceError> {
        self.config
            .validate()
            .map_err(|e| SourceError::UnsupportedType(e.to_string()))?;
        self.config.camera_type = camera_type;
        self.open = true;
        self.sequence = 0;
        tracing::info!(
            camera = %camera_type,
            width = self.config.width,
            height = self.config.height,
            ffc = ?ffc_path,
            "Synthetic camera opened"
        );
        Ok((self.config.width, self.config.height))
    }

    fn read(&mut self) -> Result<RawFrame, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }

        let phase = self.sequence as f32 * 0.05;
        let (w, h) = (self.config.width as f32, self.config.height as f32);
        let (sin, cos) = phase.sin_cos();
        let blob_x = w * (0.5 + 0.3 * cos);
        let blob_y = h * (0.5 + 0.3 * sin);
        let blob_radius_sq = (w.min(h) * 0.12).powi(2);

        self.sequence += 1;
        let frame = RawFrame::from_fn(self.config.width, self.config.height, self.sequence, |x, y| {
            let nx = x as f32 / w - 0.5;
            let ny = y as f32 / h - 0.5;
            // +-250 counts is roughly +-10 C across the gradient
            let gradient = (nx * cos + ny * sin) * 500.0;
            let dx = x as f32 - blob_x;
            let dy = y as f32 - blob_y;
            let blob = 500.0 * (-(dx * dx + dy * dy) / blob_radius_sq).exp();
            let value = Self::BASE_COUNTS + gradient + blob;
            value.clamp(0.0, u16::MAX as f32) as u16
        });
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
        tracing::info!("Synthetic camera closed");
    }
}

/// Frame source that replays a fixed script of frames and failures.
///
/// Once the script is exhausted the last successful frame repeats.
#[derive(Debug, Default)]
pub struct ReplayCamera {
    script: VecDeque<Result<RawFrame, SourceError>>,
    last: Option<RawFrame>,
    dimensions: (u32, u32),
    open: bool,
    open_error: Option<SourceError>,
    closed_count: u32,
}

impl ReplayCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimensions: (width, height),
            ..Default::default()
        }
    }

    /// Queues a frame.
    pub fn push_frame(&mut self, frame: RawFrame) -> &mut Self {
        self.script.push_back(Ok(frame));
        self
    }

    /// Queues a read failure.
    pub fn push_error(&mut self, error: SourceError) -> &mut Self {
        self.script.push_back(Err(error));
        self
    }

    /// Makes the next `open` call fail.
    pub fn fail_open(mut self, error: SourceError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Number of times `close` has been called.
    pub fn closed_count(&self) -> u32 {
        self.closed_count
    }
}

impl FrameSource for ReplayCamera {
    fn open(
        &mut self,
        _camera_type: CameraType,
        _ffc_path: Option<&Path>,
    ) -> Result<(u32, u32), SourceError> {
        if let Some(error) = self.open_error.take() {
            return Err(error);
        }
        self.open = true;
        Ok(self.dimensions)
    }

    fn read(&mut self) -> Result<RawFrame, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        match self.script.pop_front() {
            Some(Ok(frame)) => {
                self.last = Some(frame.clone());
                Ok(frame)
            }
            Some(Err(error)) => Err(error),
            None => self.last.clone().ok_or(SourceError::Timeout),
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
        self.closed_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_camera_lifecycle() {
        let mut camera = SyntheticCamera::new(CaptureConfig::with_dimensions(32, 24));

        assert!(!camera.is_open());

        let dims = camera.open(CameraType::Seek, None).unwrap();
        assert_eq!(dims, (32, 24));
        assert!(camera.is_open());

        let frame = camera.read().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.read().unwrap();
        assert_eq!(frame2.sequence(), 2);

        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_read_without_open() {
        let mut camera = SyntheticCamera::new(CaptureConfig::default());
        assert!(matches!(camera.read(), Err(SourceError::NotOpen)));
    }

    #[test]
    fn test_replay_repeats_last_frame() {
        let mut camera = ReplayCamera::new(2, 2);
        camera
            .push_frame(RawFrame::uniform(5, 2, 2, 1))
            .push_error(SourceError::Timeout);
        camera.open(CameraType::Seek, None).unwrap();

        assert_eq!(camera.read().unwrap().counts(), &[5, 5, 5, 5]);
        assert!(matches!(camera.read(), Err(SourceError::Timeout)));
        assert_eq!(camera.read().unwrap().sequence(), 1);
    }
}
