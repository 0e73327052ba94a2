//! The per-frame control loop.
//!
//! One iteration drains button presses, reads a frame, converts it, runs
//! the active mode's processing, draws overlays, orients the result and
//! hands it to the display, then sleeps out the rest of the frame budget.
//! Every failure inside an iteration is recoverable and reported in the
//! [`IterationReport`]; only opening the camera can fail fatally.

use super::{FramePacer, PipelineError};
use crate::calibration::{
    FfcCalibrator, FfcProfile, FfcState, FfcStep, ProfileStore, FRAMES_TO_AVERAGE,
};
use crate::capture::{CameraType, FrameSource, RawFrame, SourceError};
use crate::config::{Config, ConfigStore};
use crate::input::ButtonSource;
use crate::metrics::{PipelineMetrics, PipelineStats};
use crate::modes::{Button, Command, Mode, ModeMachine, ModeState};
use crate::output::{FrameSink, Orientation};
use crate::overlay::{NotificationQueue, OverlayRenderer, Readout};
use crate::processing::{
    extrema, highlight, mask_from_indices, tint, HotColdDetector, Palette, TemperatureConverter,
    COLD_SPOT_COLOR, HOT_SPOT_COLOR,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Blend weight of highlight tints over the palette image.
const HIGHLIGHT_ALPHA: f32 = 0.6;

/// Startup overrides and loop parameters.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Overrides the configured camera type.
    pub camera_type: Option<CameraType>,
    /// Overrides the configured palette.
    pub palette: Option<Palette>,
    /// Profile to load instead of the configured one.
    pub ffc_path: Option<PathBuf>,
    /// When false no profile is loaded at startup.
    pub load_ffc: bool,
    /// Start in FFC mode with a capture already running.
    pub capture_ffc: bool,
    pub orientation: Orientation,
    pub fps: u32,
    pub frames_to_average: usize,
    pub overlay_scale: u32,
    /// Stop after this many iterations.
    pub max_frames: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            camera_type: None,
            palette: None,
            ffc_path: None,
            load_ffc: true,
            capture_ffc: false,
            orientation: Orientation::default(),
            fps: 9,
            frames_to_average: FRAMES_TO_AVERAGE,
            overlay_scale: 2,
            max_frames: None,
        }
    }
}

/// Persistence back-ends used by the pipeline.
pub struct Stores {
    pub config: Box<dyn ConfigStore>,
    pub profiles: Box<dyn ProfileStore>,
}

/// What happened during one iteration.
#[derive(Debug, Default)]
pub struct IterationReport {
    /// Sequence number of the processed frame, if one was read.
    pub sequence: Option<u64>,
    pub presses: usize,
    /// Recoverable errors, in the order they occurred.
    pub errors: Vec<PipelineError>,
    pub elapsed: Duration,
    pub overran: bool,
}

impl IterationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Owns every collaborator and runs the frame loop.
pub struct Pipeline<C: FrameSource, K: FrameSink> {
    camera: C,
    sink: K,
    buttons: Box<dyn ButtonSource>,
    config_store: Box<dyn ConfigStore>,
    profile_store: Box<dyn ProfileStore>,

    config: Config,
    camera_type: CameraType,
    dimensions: (u32, u32),

    machine: ModeMachine,
    converter: TemperatureConverter,
    calibrator: FfcCalibrator,
    detector: HotColdDetector,
    renderer: OverlayRenderer,
    notifications: NotificationQueue,
    orientation: Orientation,
    pacer: FramePacer,

    max_frames: Option<u64>,
    iterations: u64,
    stats: PipelineStats,
    metrics: Option<PipelineMetrics>,
    mismatch_reported: bool,
    closed: bool,
}

impl<C: FrameSource, K: FrameSink> Pipeline<C, K> {
    /// Loads config and calibration, then opens the camera.
    ///
    /// A camera that cannot be opened is fatal; the sink is closed before
    /// the error is returned.
    pub fn start(
        mut camera: C,
        mut sink: K,
        buttons: Box<dyn ButtonSource>,
        stores: Stores,
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        let Stores {
            config: config_store,
            profiles: profile_store,
        } = stores;

        let mut config = config_store.load_or_default();
        if let Some(camera_type) = options.camera_type {
            config.camera_type = camera_type;
        }
        if let Some(palette) = options.palette {
            config.palette_index = palette.index();
        }
        let camera_type = config.camera_type;

        let mut converter = TemperatureConverter::new(camera_type);
        if options.load_ffc {
            let requested = options.ffc_path.clone().or_else(|| config.ffc_path.clone());
            if let Some(profile) =
                select_profile(profile_store.as_ref(), camera_type, requested.as_deref())
            {
                let path = profile.path().map(Path::to_path_buf);
                match converter.set_profile(profile) {
                    Ok(()) => config.ffc_path = path,
                    Err(mismatch) => {
                        tracing::warn!(error = %mismatch, "Ignoring flat-field profile")
                    }
                }
            }
        }

        let profile_path = converter
            .profile()
            .and_then(FfcProfile::path)
            .map(Path::to_path_buf);
        let dimensions = match camera.open(camera_type, profile_path.as_deref()) {
            Ok(dimensions) => dimensions,
            Err(e) => {
                tracing::error!(camera = %camera_type, error = %e, "Camera open failed");
                sink.close();
                return Err(PipelineError::FatalOpenFailure {
                    device: "camera",
                    reason: e.to_string(),
                });
            }
        };
        tracing::info!(
            camera = %camera_type,
            width = dimensions.0,
            height = dimensions.1,
            ffc = profile_path.is_some(),
            "Camera opened"
        );

        let mut machine = ModeMachine::new(ModeState::from_config(&config));
        let mut notifications = NotificationQueue::new();
        let mut calibrator = FfcCalibrator::with_frames(options.frames_to_average);
        let now = Instant::now();
        if options.capture_ffc {
            machine.enter_calibration();
            match calibrator.start() {
                Ok(()) => notifications.push("Capturing flat field...", now),
                Err(e) => tracing::warn!(error = %e, "Flat-field capture not started"),
            }
        } else {
            notifications.push(format!("{} Mode", machine.mode().name()), now);
        }

        let stats = PipelineStats {
            profile_loaded: converter.profile().is_some(),
            ..PipelineStats::default()
        };

        Ok(Self {
            camera,
            sink,
            buttons,
            config_store,
            profile_store,
            config,
            camera_type,
            dimensions,
            machine,
            converter,
            calibrator,
            detector: HotColdDetector::default(),
            renderer: OverlayRenderer::with_scale(options.overlay_scale),
            notifications,
            orientation: options.orientation,
            pacer: FramePacer::from_fps(options.fps),
            max_frames: options.max_frames,
            iterations: 0,
            stats,
            metrics: None,
            mismatch_reported: false,
            closed: false,
        })
    }

    /// Attaches a metrics registry updated after every iteration.
    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        metrics.update(&self.stats);
        self.metrics = Some(metrics);
        self
    }

    /// Runs iterations until `cancel` is set or the frame limit is reached.
    pub fn run(&mut self, cancel: &AtomicBool) -> PipelineStats {
        tracing::info!(
            budget_ms = self.pacer.budget().as_millis() as u64,
            "Pipeline running"
        );
        loop {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!("Cancellation requested");
                break;
            }
            if self.max_frames.map_or(false, |max| self.iterations >= max) {
                tracing::info!(iterations = self.iterations, "Frame limit reached");
                break;
            }
            self.run_iteration();
        }
        self.stats.clone()
    }

    /// Runs one iteration of the loop, including the pacing sleep.
    pub fn run_iteration(&mut self) -> IterationReport {
        let started = Instant::now();
        let mut report = IterationReport::default();
        self.iterations += 1;

        for button in self.buttons.poll() {
            report.presses += 1;
            self.handle_button(button, started, &mut report);
        }

        match self.camera.read().and_then(|frame| self.check_frame(frame)) {
            Ok(frame) => self.process(frame, &mut report),
            Err(e) => {
                self.stats.acquisition_failures += 1;
                tracing::warn!(error = %e, "Frame acquisition failed, skipping");
                if let Some(err) = self.calibrator.frame_lost(&e) {
                    self.stats.ffc_failures += 1;
                    self.conclude_calibration("FFC capture failed", started);
                    report.errors.push(err.into());
                }
                report.errors.push(PipelineError::AcquisitionFailure(e));
            }
        }

        let pacing = self.pacer.pace(started);
        report.elapsed = pacing.elapsed;
        report.overran = pacing.overran(self.pacer.budget());
        self.stats.last_frame_seconds = pacing.elapsed.as_secs_f64();
        if report.overran {
            self.stats.budget_overruns += 1;
            tracing::debug!(
                elapsed_ms = pacing.elapsed.as_millis() as u64,
                budget_ms = self.pacer.budget().as_millis() as u64,
                "Frame over budget"
            );
        }
        tracing::trace!(
            iteration = self.iterations,
            elapsed_us = pacing.elapsed.as_micros() as u64,
            slept_us = pacing.slept.as_micros() as u64,
            "Iteration complete"
        );

        if let Some(metrics) = &self.metrics {
            metrics.update(&self.stats);
        }
        report
    }

    /// Saves the config and releases camera and display. Idempotent.
    pub fn shutdown(&mut self) -> Result<(), PipelineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.machine.state().store_into(&mut self.config);
        let saved = self
            .config_store
            .save(&self.config)
            .map_err(|e| PipelineError::PersistFailure {
                what: "config",
                reason: e.to_string(),
            });
        if let Err(e) = &saved {
            self.stats.config_save_failures += 1;
            tracing::warn!(error = %e, "Config not saved on shutdown");
        }

        self.camera.close();
        self.sink.close();
        if let Some(metrics) = &self.metrics {
            metrics.update(&self.stats);
        }
        tracing::info!(
            frames = self.stats.frames_processed,
            acquisition_failures = self.stats.acquisition_failures,
            "Pipeline shut down"
        );
        saved
    }

    fn handle_button(&mut self, button: Button, now: Instant, report: &mut IterationReport) {
        let outcome = self.machine.handle(button, self.calibrator.is_busy());
        if let Some(text) = outcome.notification {
            self.notifications.push(text, now);
        }
        if outcome.persist {
            self.persist_config(report);
        }
        match outcome.command {
            Some(Command::StartCalibration) => {
                if let Err(e) = self.calibrator.start() {
                    tracing::warn!(error = %e, "Flat-field capture not started");
                }
            }
            None => {}
        }
    }

    /// Rejects frames that do not match the size fixed at open.
    fn check_frame(&self, frame: RawFrame) -> Result<RawFrame, SourceError> {
        if !frame.is_valid() {
            return Err(SourceError::BadFrame(format!(
                "{} counts for a {}x{} frame",
                frame.counts().len(),
                frame.width(),
                frame.height()
            )));
        }
        if frame.dimensions() != self.dimensions {
            return Err(SourceError::BadFrame(format!(
                "frame is {:?}, camera opened at {:?}",
                frame.dimensions(),
                self.dimensions
            )));
        }
        Ok(frame)
    }

    fn process(&mut self, raw: RawFrame, report: &mut IterationReport) {
        report.sequence = Some(raw.sequence());
        let now = Instant::now();

        match self.calibrator.push_frame(&raw) {
            Ok(FfcStep::Ignored) | Ok(FfcStep::Progress { .. }) => {}
            Ok(FfcStep::Ready) => self.finish_calibration(now, report),
            Err(e) => {
                self.stats.ffc_failures += 1;
                self.conclude_calibration("FFC capture failed", now);
                report.errors.push(e.into());
            }
        }

        let state = self.machine.state();
        let conversion = self.converter.convert(&raw, state.exposure_lock);
        if let Some(mismatch) = conversion.mismatch {
            self.stats.calibration_mismatches += 1;
            if !self.mismatch_reported {
                tracing::warn!(error = %mismatch, "Converting without flat-field correction");
                self.mismatch_reported = true;
            }
            report.errors.push(mismatch.into());
        }
        let frame = conversion.frame;

        let mut image = state.palette.apply(&frame);
        let threshold;
        let spots;
        let readout = match state.mode {
            Mode::Live => {
                threshold = highlight(&frame, state.threshold_c, state.comparator);
                let color = state.comparator.highlight_color();
                tint(&mut image, &threshold.mask, color, HIGHLIGHT_ALPHA);
                Readout::Threshold {
                    matched: &threshold,
                    extrema: extrema(&frame),
                }
            }
            Mode::HotCold => match self.detector.detect(&frame) {
                Some(found) => {
                    spots = found;
                    let len = frame.temps().len();
                    let hot = mask_from_indices(len, &spots.hot);
                    let cold = mask_from_indices(len, &spots.cold);
                    tint(&mut image, &hot, HOT_SPOT_COLOR, HIGHLIGHT_ALPHA);
                    tint(&mut image, &cold, COLD_SPOT_COLOR, HIGHLIGHT_ALPHA);
                    Readout::HotCold(&spots)
                }
                None => Readout::None,
            },
            Mode::Ffc => Readout::Calibration {
                state: self.calibrator.state(),
                total: self.calibrator.frames_to_average(),
            },
            Mode::Palette => match extrema(&frame) {
                Some((min, max)) => Readout::Extrema { min, max },
                None => Readout::None,
            },
            Mode::Settings => Readout::None,
        };

        let banner = self.notifications.current(now).map(|n| n.text());
        self.renderer.render(&mut image, state, readout, banner);

        let image = self.orientation.apply(image);
        match self.sink.push(&image) {
            Ok(()) => self.stats.frames_processed += 1,
            Err(e) => {
                self.stats.sink_failures += 1;
                tracing::warn!(error = %e, "Display rejected frame");
                report.errors.push(PipelineError::SinkFailure(e));
            }
        }
    }

    fn finish_calibration(&mut self, now: Instant, report: &mut IterationReport) {
        match self
            .calibrator
            .finish(self.camera_type, self.profile_store.as_mut())
        {
            Ok(profile) => {
                let path = profile.path().map(Path::to_path_buf);
                if let Err(mismatch) = self.converter.set_profile(profile) {
                    tracing::warn!(error = %mismatch, "New flat-field profile rejected");
                } else {
                    self.stats.profile_loaded = true;
                    self.mismatch_reported = false;
                    self.config.ffc_path = path;
                }
                self.stats.ffc_captures += 1;
                self.conclude_calibration("FFC saved", now);
                self.persist_config(report);
            }
            Err(e) => {
                self.stats.ffc_failures += 1;
                self.conclude_calibration("FFC save failed", now);
                report.errors.push(e.into());
            }
        }
    }

    /// Announces a terminal calibration state and leaves FFC mode.
    fn conclude_calibration(&mut self, message: &str, now: Instant) {
        self.notifications.push(message, now);
        self.calibrator.reset();
        self.machine.finish_calibration();
    }

    fn persist_config(&mut self, report: &mut IterationReport) {
        self.machine.state().store_into(&mut self.config);
        if let Err(e) = self.config_store.save(&self.config) {
            self.stats.config_save_failures += 1;
            tracing::warn!(error = %e, "Config not saved, keeping in-memory settings");
            report.errors.push(PipelineError::PersistFailure {
                what: "config",
                reason: e.to_string(),
            });
        }
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_store(&self) -> &dyn ConfigStore {
        self.config_store.as_ref()
    }

    pub fn mode_state(&self) -> &ModeState {
        self.machine.state()
    }

    pub fn calibration_state(&self) -> &FfcState {
        self.calibrator.state()
    }

    pub fn converter(&self) -> &TemperatureConverter {
        &self.converter
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn camera_type(&self) -> CameraType {
        self.camera_type
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn metrics(&self) -> Option<&PipelineMetrics> {
        self.metrics.as_ref()
    }
}

impl<C: FrameSource, K: FrameSink> Drop for Pipeline<C, K> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "Shutdown on drop incomplete");
        }
    }
}

/// Picks the startup profile: `requested` if it loads and fits the camera,
/// otherwise the newest stored profile for the camera.
fn select_profile(
    store: &dyn ProfileStore,
    camera_type: CameraType,
    requested: Option<&Path>,
) -> Option<FfcProfile> {
    if let Some(path) = requested {
        match store.load(path) {
            Ok(profile) if profile.camera_type() == camera_type => return Some(profile),
            Ok(profile) => tracing::warn!(
                path = %path.display(),
                profile = %profile.camera_type(),
                active = %camera_type,
                "Flat-field profile is for another camera"
            ),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Could not load flat-field profile"
            ),
        }
    }
    match store.latest(camera_type) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "Could not search for flat-field profiles");
            None
        }
    }
}
