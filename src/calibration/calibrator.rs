//! Flat-field capture state machine.
//!
//! The calibrator never blocks: the pipeline hands it one frame per loop
//! iteration while capturing, then asks it to finish once enough frames
//! have been accumulated.

use super::{FfcProfile, ProfileError, ProfileStore};
use crate::capture::{CameraType, RawFrame};
use chrono::Local;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Frames averaged into one profile.
pub const FRAMES_TO_AVERAGE: usize = 60;

/// Calibration errors.
#[derive(Debug, Error)]
pub enum FfcError {
    #[error("flat-field capture already in progress")]
    Busy,
    #[error("flat-field capture lost a frame: {0}")]
    CaptureFailed(String),
    #[error("flat-field capture has not collected enough frames")]
    NotReady,
    #[error("failed to persist flat-field profile: {0}")]
    PersistFailed(#[source] ProfileError),
}

/// Calibrator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FfcState {
    Idle,
    Capturing { captured: usize },
    Averaging,
    Saved { path: PathBuf },
    Failed { reason: String },
}

impl FfcState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Saved { .. } | Self::Failed { .. })
    }
}

/// Outcome of handing a frame to the calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfcStep {
    /// Not capturing; the frame was ignored.
    Ignored,
    /// Frame accumulated.
    Progress { captured: usize, total: usize },
    /// Last frame accumulated; call [`FfcCalibrator::finish`].
    Ready,
}

/// Accumulates frames and produces a flat-field profile.
pub struct FfcCalibrator {
    state: FfcState,
    frames_to_average: usize,
    accumulator: Vec<u64>,
    dimensions: Option<(u32, u32)>,
}

impl FfcCalibrator {
    pub fn new() -> Self {
        Self::with_frames(FRAMES_TO_AVERAGE)
    }

    /// Creates a calibrator averaging `frames` frames.
    pub fn with_frames(frames: usize) -> Self {
        Self {
            state: FfcState::Idle,
            frames_to_average: frames.max(1),
            accumulator: Vec::new(),
            dimensions: None,
        }
    }

    pub fn state(&self) -> &FfcState {
        &self.state
    }

    pub fn frames_to_average(&self) -> usize {
        self.frames_to_average
    }

    /// True while capturing or averaging.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, FfcState::Capturing { .. } | FfcState::Averaging)
    }

    /// Starts a new capture. Idle and terminal states may restart.
    pub fn start(&mut self) -> Result<(), FfcError> {
        if self.is_busy() {
            return Err(FfcError::Busy);
        }
        self.clear_accumulator();
        self.state = FfcState::Capturing { captured: 0 };
        tracing::info!(frames = self.frames_to_average, "Flat-field capture started");
        Ok(())
    }

    /// Accumulates one frame.
    ///
    /// A frame whose size differs from the first captured frame fails the
    /// capture.
    pub fn push_frame(&mut self, frame: &RawFrame) -> Result<FfcStep, FfcError> {
        let captured = match self.state {
            FfcState::Capturing { captured } => captured,
            _ => return Ok(FfcStep::Ignored),
        };

        match self.dimensions {
            None => {
                self.dimensions = Some(frame.dimensions());
                self.accumulator = vec![0; frame.pixel_count()];
            }
            Some(dims) if dims != frame.dimensions() => {
                return Err(self.fail(format!(
                    "frame size changed from {dims:?} to {:?}",
                    frame.dimensions()
                )));
            }
            Some(_) => {}
        }

        for (acc, &count) in self.accumulator.iter_mut().zip(frame.counts()) {
            *acc += count as u64;
        }

        let captured = captured + 1;
        tracing::trace!(captured, total = self.frames_to_average, "Flat-field frame accumulated");
        if captured >= self.frames_to_average {
            self.state = FfcState::Averaging;
            Ok(FfcStep::Ready)
        } else {
            self.state = FfcState::Capturing { captured };
            Ok(FfcStep::Progress {
                captured,
                total: self.frames_to_average,
            })
        }
    }

    /// Records a frame acquisition failure.
    ///
    /// While capturing this discards the accumulation and moves to
    /// `Failed`; otherwise it is a no-op and returns `None`.
    pub fn frame_lost(&mut self, reason: impl fmt::Display) -> Option<FfcError> {
        match self.state {
            FfcState::Capturing { .. } => Some(self.fail(reason.to_string())),
            _ => None,
        }
    }

    /// Averages the accumulated frames and persists the profile.
    pub fn finish(
        &mut self,
        camera_type: CameraType,
        store: &mut dyn ProfileStore,
    ) -> Result<FfcProfile, FfcError> {
        if self.state != FfcState::Averaging {
            return Err(FfcError::NotReady);
        }
        let (width, height) = self.dimensions.unwrap_or((0, 0));
        let n = self.frames_to_average as u64;
        let mean: Vec<u16> = self
            .accumulator
            .iter()
            .map(|&sum| ((sum + n / 2) / n).min(u16::MAX as u64) as u16)
            .collect();
        self.clear_accumulator();

        let profile = match FfcProfile::from_mean(mean, width, height, camera_type, Local::now()) {
            Some(profile) => profile,
            None => return Err(self.fail("no frames accumulated")),
        };

        match store.save(&profile) {
            Ok(path) => {
                self.state = FfcState::Saved { path: path.clone() };
                Ok(profile.with_path(path))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Flat-field profile could not be saved");
                self.state = FfcState::Failed {
                    reason: e.to_string(),
                };
                Err(FfcError::PersistFailed(e))
            }
        }
    }

    /// Returns to `Idle`, discarding any partial capture.
    pub fn reset(&mut self) {
        self.clear_accumulator();
        self.state = FfcState::Idle;
    }

    fn fail(&mut self, reason: impl Into<String>) -> FfcError {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "Flat-field capture failed");
        self.clear_accumulator();
        self.state = FfcState::Failed {
            reason: reason.clone(),
        };
        FfcError::CaptureFailed(reason)
    }

    fn clear_accumulator(&mut self) {
        self.accumulator.clear();
        self.dimensions = None;
    }
}

impl Default for FfcCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FfcCalibrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfcCalibrator")
            .field("state", &self.state)
            .field("frames_to_average", &self.frames_to_average)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}
