//! Flat-field calibration.
//!
//! Covers the correction profile itself, the multi-frame capture state
//! machine that builds one, and profile persistence.

mod calibrator;
mod profile;
mod store;

pub use calibrator::{FfcCalibrator, FfcError, FfcState, FfcStep, FRAMES_TO_AVERAGE};
pub use profile::{CalibrationMismatch, FfcProfile};
pub use store::{DirectoryProfileStore, ProfileError, ProfileStore};
