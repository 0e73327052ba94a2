//! Pipeline error taxonomy.
//!
//! Collaborator errors are folded into [`PipelineError`] at the
//! orchestrator boundary. Only [`PipelineError::FatalOpenFailure`] ever
//! leaves the orchestrator; the rest are reported per iteration.

use crate::calibration::{CalibrationMismatch, FfcError};
use crate::capture::SourceError;
use crate::output::SinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Frame read failed; the iteration was skipped.
    #[error("frame acquisition failed: {0}")]
    AcquisitionFailure(#[source] SourceError),

    /// The loaded profile does not fit; the frame was converted without it.
    #[error("flat-field profile not applied: {0}")]
    CalibrationMismatch(#[from] CalibrationMismatch),

    /// A flat-field capture was abandoned.
    #[error("flat-field capture failed: {0}")]
    CalibrationCaptureFailure(#[source] FfcError),

    /// Config or profile could not be written; in-memory state is kept.
    #[error("failed to persist {what}: {reason}")]
    PersistFailure { what: &'static str, reason: String },

    /// The display rejected the frame.
    #[error("display failure: {0}")]
    SinkFailure(#[source] SinkError),

    /// Camera or display could not be opened.
    #[error("failed to open {device}: {reason}")]
    FatalOpenFailure { device: &'static str, reason: String },
}

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalOpenFailure { .. })
    }
}

impl From<FfcError> for PipelineError {
    fn from(e: FfcError) -> Self {
        match e {
            FfcError::PersistFailed(inner) => Self::PersistFailure {
                what: "flat-field profile",
                reason: inner.to_string(),
            },
            other => Self::CalibrationCaptureFailure(other),
        }
    }
}
