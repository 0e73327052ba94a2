//! Camera input and frame handling.
//!
//! This module provides the frame source abstraction the pipeline reads
//! from, the raw frame type, and capture configuration. The sensor driver
//! itself is an external collaborator.

mod camera;
mod config;
mod frame;

pub use camera::{FrameSource, ReplayCamera, SourceError, SyntheticCamera};
pub use config::{CameraType, CaptureConfig, CaptureConfigError};
pub use frame::RawFrame;
