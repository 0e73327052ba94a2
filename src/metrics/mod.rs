//! Prometheus metrics for the viewer pipeline.
//!
//! The pipeline keeps plain running totals in [`PipelineStats`]; the
//! registry is brought up to date from them and encoded in the text
//! exposition format.

mod collector;

pub use collector::{MetricsError, PipelineMetrics, PipelineStats};
