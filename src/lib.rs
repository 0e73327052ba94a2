//! Thermal Viewer Library
//!
//! Turns raw frames from a Seek thermal sensor into a live, annotated
//! display on a small LCD, driven by three buttons.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → processing → overlay → output
//!              ↑    ↑
//!          modes   calibration
//! ```
//!
//! The [`pipeline`] module owns every collaborator and runs one iteration
//! per frame under a fixed time budget. Button presses go through the
//! [`modes`] state machine, which decides which processing stage runs and
//! what the HUD shows. Flat-field calibration captures frames across
//! iterations and hot-swaps the resulting profile into the converter.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use thermal_viewer::{
//!     calibration::DirectoryProfileStore,
//!     capture::{CaptureConfig, SyntheticCamera},
//!     config::FileConfigStore,
//!     input::ScriptedButtons,
//!     output::NullSink,
//!     pipeline::{Pipeline, PipelineOptions, Stores},
//! };
//!
//! let stores = Stores {
//!     config: Box::new(FileConfigStore::default_location()),
//!     profiles: Box::new(DirectoryProfileStore::new("/tmp/ffc")),
//! };
//! let mut pipeline = Pipeline::start(
//!     SyntheticCamera::new(CaptureConfig::default()),
//!     NullSink::new(),
//!     Box::new(ScriptedButtons::new()),
//!     stores,
//!     PipelineOptions {
//!         max_frames: Some(100),
//!         ..PipelineOptions::default()
//!     },
//! )?;
//!
//! pipeline.run(&AtomicBool::new(false));
//! pipeline.shutdown()?;
//! # Ok::<(), thermal_viewer::pipeline::PipelineError>(())
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod calibration;
pub mod capture;
pub mod config;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod processing;

// Re-export commonly used types at crate root
pub use calibration::{FfcCalibrator, FfcProfile, FfcState};
pub use capture::{CameraType, FrameSource, RawFrame, SyntheticCamera};
pub use config::Config;
pub use modes::{Button, Mode, ModeMachine, ModeState};
pub use output::{FrameSink, NullSink};
pub use pipeline::{Pipeline, PipelineError, PipelineOptions};
pub use processing::{CalibratedFrame, Palette, TemperatureConverter, TemperatureUnit};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
