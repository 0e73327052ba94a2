//! Frame loop orchestration.

mod error;
mod orchestrator;
mod timing;

pub use error::PipelineError;
pub use orchestrator::{IterationReport, Pipeline, PipelineOptions, Stores};
pub use timing::{FramePacer, Pacing};
