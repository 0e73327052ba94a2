//! Metrics collection and registry.

use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("failed to write metrics: {0}")]
    Io(#[from] std::io::Error),
}

/// Running totals kept by the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    /// Iterations that produced a frame.
    pub frames_processed: u64,
    pub acquisition_failures: u64,
    pub sink_failures: u64,
    /// Iterations that exceeded the frame budget.
    pub budget_overruns: u64,
    /// Frames converted without correction because the profile did not fit.
    pub calibration_mismatches: u64,
    pub ffc_captures: u64,
    pub ffc_failures: u64,
    pub config_save_failures: u64,
    /// Processing time of the most recent iteration, in seconds.
    pub last_frame_seconds: f64,
    /// Whether a flat-field profile is applied.
    pub profile_loaded: bool,
}

/// Prometheus metrics registry for the viewer pipeline.
pub struct PipelineMetrics {
    registry: Registry,

    frames_processed: IntCounter,
    acquisition_failures: IntCounter,
    sink_failures: IntCounter,
    budget_overruns: IntCounter,
    calibration_mismatches: IntCounter,

    ffc_captures: IntCounter,
    ffc_failures: IntCounter,
    config_save_failures: IntCounter,

    last_frame_seconds: Gauge,
    profile_loaded: IntGauge,
}

impl PipelineMetrics {
    /// Creates a registry with all pipeline metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_processed = IntCounter::new(
            "thermal_viewer_frames_processed_total",
            "Frames converted, rendered and handed to the display",
        )?;
        let acquisition_failures = IntCounter::new(
            "thermal_viewer_acquisition_failures_total",
            "Frame reads that failed and were skipped",
        )?;
        let sink_failures = IntCounter::new(
            "thermal_viewer_sink_failures_total",
            "Frames the display rejected",
        )?;
        let budget_overruns = IntCounter::new(
            "thermal_viewer_budget_overruns_total",
            "Iterations that took longer than the frame budget",
        )?;
        let calibration_mismatches = IntCounter::new(
            "thermal_viewer_calibration_mismatches_total",
            "Frames converted without flat-field correction due to a profile mismatch",
        )?;
        let ffc_captures = IntCounter::new(
            "thermal_viewer_ffc_captures_total",
            "Flat-field profiles captured and saved",
        )?;
        let ffc_failures = IntCounter::new(
            "thermal_viewer_ffc_failures_total",
            "Flat-field captures that failed",
        )?;
        let config_save_failures = IntCounter::new(
            "thermal_viewer_config_save_failures_total",
            "Config saves that failed",
        )?;
        let last_frame_seconds = Gauge::new(
            "thermal_viewer_last_frame_seconds",
            "Processing time of the most recent frame",
        )?;
        let profile_loaded = IntGauge::new(
            "thermal_viewer_ffc_profile_loaded",
            "Whether a flat-field profile is applied (1=yes, 0=no)",
        )?;

        registry.register(Box::new(frames_processed.clone()))?;
        registry.register(Box::new(acquisition_failures.clone()))?;
        registry.register(Box::new(sink_failures.clone()))?;
        registry.register(Box::new(budget_overruns.clone()))?;
        registry.register(Box::new(calibration_mismatches.clone()))?;
        registry.register(Box::new(ffc_captures.clone()))?;
        registry.register(Box::new(ffc_failures.clone()))?;
        registry.register(Box::new(config_save_failures.clone()))?;
        registry.register(Box::new(last_frame_seconds.clone()))?;
        registry.register(Box::new(profile_loaded.clone()))?;

        Ok(Self {
            registry,
            frames_processed,
            acquisition_failures,
            sink_failures,
            budget_overruns,
            calibration_mismatches,
            ffc_captures,
            ffc_failures,
            config_save_failures,
            last_frame_seconds,
            profile_loaded,
        })
    }

    /// Brings every metric up to date with `stats`.
    ///
    /// Counters only move forward; a total lower than the current counter
    /// value is ignored.
    pub fn update(&self, stats: &PipelineStats) {
        advance(&self.frames_processed, stats.frames_processed);
        advance(&self.acquisition_failures, stats.acquisition_failures);
        advance(&self.sink_failures, stats.sink_failures);
        advance(&self.budget_overruns, stats.budget_overruns);
        advance(&self.calibration_mismatches, stats.calibration_mismatches);
        advance(&self.ffc_captures, stats.ffc_captures);
        advance(&self.ffc_failures, stats.ffc_failures);
        advance(&self.config_save_failures, stats.config_save_failures);

        self.last_frame_seconds.set(stats.last_frame_seconds);
        self.profile_loaded.set(if stats.profile_loaded { 1 } else { 0 });
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Writes the text exposition to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), MetricsError> {
        std::fs::write(path.as_ref(), self.encode()?)?;
        Ok(())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let metrics = PipelineMetrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_encode_contains_all_metrics() {
        let metrics = PipelineMetrics::new().unwrap();
        let output = metrics.encode().unwrap();

        assert!(output.contains("thermal_viewer_frames_processed_total"));
        assert!(output.contains("thermal_viewer_acquisition_failures_total"));
        assert!(output.contains("thermal_viewer_sink_failures_total"));
        assert!(output.contains("thermal_viewer_budget_overruns_total"));
        assert!(output.contains("thermal_viewer_ffc_captures_total"));
        assert!(output.contains("thermal_viewer_last_frame_seconds"));
        assert!(output.contains("thermal_viewer_ffc_profile_loaded"));
    }

    #[test]
    fn test_update_from_stats() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.update(&PipelineStats {
            frames_processed: 42,
            acquisition_failures: 3,
            profile_loaded: true,
            last_frame_seconds: 0.05,
            ..Default::default()
        });

        let output = metrics.encode().unwrap();
        assert!(output.contains("thermal_viewer_frames_processed_total 42"));
        assert!(output.contains("thermal_viewer_acquisition_failures_total 3"));
        assert!(output.contains("thermal_viewer_ffc_profile_loaded 1"));
        assert!(output.contains("thermal_viewer_last_frame_seconds 0.05"));
    }

    #[test]
    fn test_counters_never_decrease() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.update(&PipelineStats {
            frames_processed: 10,
            ..Default::default()
        });
        metrics.update(&PipelineStats {
            frames_processed: 4,
            ..Default::default()
        });
        let output = metrics.encode().unwrap();
        assert!(output.contains("thermal_viewer_frames_processed_total 10"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.prom");
        let metrics = PipelineMetrics::new().unwrap();
        metrics.write_to(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# TYPE thermal_viewer_frames_processed_total counter"));
    }
}
