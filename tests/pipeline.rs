//! End-to-end tests of the frame loop against scripted hardware.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use thermal_viewer::calibration::{DirectoryProfileStore, FfcState};
use thermal_viewer::capture::{
    CameraType, CaptureConfig, FrameSource, RawFrame, ReplayCamera, SourceError, SyntheticCamera,
};
use thermal_viewer::config::{ConfigStore, FileConfigStore, MemoryConfigStore};
use thermal_viewer::input::ScriptedButtons;
use thermal_viewer::metrics::PipelineMetrics;
use thermal_viewer::modes::{Button, Mode};
use thermal_viewer::output::NullSink;
use thermal_viewer::pipeline::{Pipeline, PipelineError, PipelineOptions, Stores};
use thermal_viewer::processing::{TemperatureConverter, TemperatureUnit};

/// Frame source that takes `delay` to deliver every frame.
struct SlowCamera {
    inner: ReplayCamera,
    delay: Duration,
}

impl FrameSource for SlowCamera {
    fn open(
        &mut self,
        camera_type: CameraType,
        ffc_path: Option<&Path>,
    ) -> Result<(u32, u32), SourceError> {
        self.inner.open(camera_type, ffc_path)
    }

    fn read(&mut self) -> Result<RawFrame, SourceError> {
        std::thread::sleep(self.delay);
        self.inner.read()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) {
        self.inner.close()
    }
}

fn patterned(sequence: u64) -> RawFrame {
    RawFrame::from_fn(8, 6, sequence, |x, y| 7000 + (x * 13 + y * 7) as u16)
}

fn replay() -> ReplayCamera {
    let mut camera = ReplayCamera::new(8, 6);
    camera.push_frame(patterned(1));
    camera
}

fn fast() -> PipelineOptions {
    PipelineOptions {
        fps: 200,
        ..PipelineOptions::default()
    }
}

fn memory_stores(dir: &Path) -> Stores {
    Stores {
        config: Box::new(MemoryConfigStore::new()),
        profiles: Box::new(DirectoryProfileStore::new(dir)),
    }
}

#[test]
fn test_over_budget_frames_still_complete() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let camera = SlowCamera {
        inner: replay(),
        delay: Duration::from_millis(25),
    };

    let mut pipeline = Pipeline::start(
        camera,
        NullSink::new(),
        Box::new(ScriptedButtons::new()),
        Stores {
            config: Box::new(FileConfigStore::new(&config_path)),
            profiles: Box::new(DirectoryProfileStore::new(dir.path().join("ffc"))),
        },
        PipelineOptions {
            fps: 60,
            max_frames: Some(3),
            ..PipelineOptions::default()
        },
    )
    .unwrap();

    let stats = pipeline.run(&AtomicBool::new(false));
    assert_eq!(stats.frames_processed, 3);
    assert_eq!(stats.budget_overruns, 3);
    assert!(stats.last_frame_seconds >= 0.025);

    pipeline.shutdown().unwrap();
    assert!(config_path.exists());
    let saved = FileConfigStore::new(&config_path).load().unwrap();
    assert_eq!(saved.threshold_c, 30.0);
}

#[test]
fn test_acquisition_failure_skips_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = ReplayCamera::new(8, 6);
    camera
        .push_frame(patterned(1))
        .push_error(SourceError::Timeout)
        .push_frame(patterned(2));

    let mut pipeline = Pipeline::start(
        camera,
        NullSink::new(),
        Box::new(ScriptedButtons::new()),
        memory_stores(dir.path()),
        fast(),
    )
    .unwrap();

    assert_eq!(pipeline.run_iteration().sequence, Some(1));

    let report = pipeline.run_iteration();
    assert_eq!(report.sequence, None);
    assert!(matches!(
        report.errors.as_slice(),
        [PipelineError::AcquisitionFailure(SourceError::Timeout)]
    ));
    assert!(!report.errors[0].is_fatal());

    assert_eq!(pipeline.run_iteration().sequence, Some(2));
    assert_eq!(pipeline.stats().acquisition_failures, 1);
    assert_eq!(pipeline.sink().pushed(), 2);
}

#[test]
fn test_malformed_frames_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = ReplayCamera::new(8, 6);
    camera
        .push_frame(patterned(1))
        .push_frame(RawFrame::uniform(7600, 4, 3, 2))
        .push_frame(RawFrame::new(vec![7600; 10], 8, 6, 3))
        .push_frame(patterned(4));

    let mut pipeline = Pipeline::start(
        camera,
        NullSink::new(),
        Box::new(ScriptedButtons::new()),
        memory_stores(dir.path()),
        fast(),
    )
    .unwrap();

    assert_eq!(pipeline.run_iteration().sequence, Some(1));

    // Resized, then truncated.
    for _ in 0..2 {
        let report = pipeline.run_iteration();
        assert_eq!(report.sequence, None);
        assert!(matches!(
            report.errors.as_slice(),
            [PipelineError::AcquisitionFailure(SourceError::BadFrame(_))]
        ));
        assert!(!report.errors[0].is_fatal());
    }

    assert_eq!(pipeline.run_iteration().sequence, Some(4));
    assert_eq!(pipeline.stats().acquisition_failures, 2);
    assert_eq!(pipeline.stats().frames_processed, 2);
    assert_eq!(pipeline.sink().pushed(), 2);
}

#[test]
fn test_malformed_frame_aborts_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = ReplayCamera::new(8, 6);
    camera
        .push_frame(patterned(1))
        .push_frame(RawFrame::uniform(7600, 6, 8, 2));

    let mut pipeline = Pipeline::start(
        camera,
        NullSink::new(),
        Box::new(ScriptedButtons::new()),
        memory_stores(dir.path()),
        PipelineOptions {
            capture_ffc: true,
            frames_to_average: 5,
            ..fast()
        },
    )
    .unwrap();

    pipeline.run_iteration();
    let report = pipeline.run_iteration();
    assert!(matches!(
        report.errors.as_slice(),
        [
            PipelineError::CalibrationCaptureFailure(_),
            PipelineError::AcquisitionFailure(SourceError::BadFrame(_))
        ]
    ));
    assert_eq!(pipeline.calibration_state(), &FfcState::Idle);
    assert_eq!(pipeline.stats().ffc_failures, 1);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_flat_field_capture_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let ffc_dir = dir.path().join("ffc");
    let config_path = dir.path().join("config.toml");

    let mut pipeline = Pipeline::start(
        replay(),
        NullSink::new(),
        Box::new(ScriptedButtons::new().then(&[Button::Mode, Button::Mode, Button::Up])),
        Stores {
            config: Box::new(FileConfigStore::new(&config_path)),
            profiles: Box::new(DirectoryProfileStore::new(&ffc_dir)),
        },
        fast(),
    )
    .unwrap();

    let first = pipeline.run_iteration();
    assert_eq!(first.presses, 3);
    assert_eq!(pipeline.mode_state().mode, Mode::Ffc);
    assert_eq!(
        pipeline.calibration_state(),
        &FfcState::Capturing { captured: 1 }
    );

    for _ in 1..60 {
        let report = pipeline.run_iteration();
        assert!(report.is_clean(), "{:?}", report.errors);
    }

    assert_eq!(pipeline.mode_state().mode, Mode::Palette);
    assert_eq!(pipeline.calibration_state(), &FfcState::Idle);
    assert_eq!(pipeline.stats().ffc_captures, 1);
    assert!(pipeline
        .notifications()
        .iter()
        .any(|n| n.text() == "FFC saved"));

    let stored: Vec<_> = std::fs::read_dir(&ffc_dir).unwrap().collect();
    assert_eq!(stored.len(), 1);

    let saved_path = pipeline.config().ffc_path.clone().unwrap();
    assert!(saved_path.starts_with(&ffc_dir));
    let on_disk = FileConfigStore::new(&config_path).load().unwrap();
    assert_eq!(on_disk.ffc_path, Some(saved_path));

    // The flat field corrects the patterned scene to its global mean.
    let profile = pipeline.converter().profile().unwrap().clone();
    let reference = pipeline.converter().model().to_celsius(profile.reference());
    let mut converter = TemperatureConverter::new(CameraType::SeekPro);
    converter.set_profile(profile).unwrap();
    let conversion = converter.convert(&patterned(99), false);
    assert!(conversion.mismatch.is_none());
    for &t in conversion.frame.temps() {
        assert!((t - reference).abs() < 1e-3, "{t} != {reference}");
    }
}

#[test]
fn test_acquisition_failure_aborts_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = ReplayCamera::new(8, 6);
    camera
        .push_frame(patterned(1))
        .push_error(SourceError::Pipe("usb reset".into()));

    let mut pipeline = Pipeline::start(
        camera,
        NullSink::new(),
        Box::new(ScriptedButtons::new()),
        memory_stores(dir.path()),
        PipelineOptions {
            capture_ffc: true,
            frames_to_average: 5,
            ..fast()
        },
    )
    .unwrap();

    pipeline.run_iteration();
    let report = pipeline.run_iteration();
    assert!(matches!(
        report.errors.as_slice(),
        [
            PipelineError::CalibrationCaptureFailure(_),
            PipelineError::AcquisitionFailure(_)
        ]
    ));
    assert_eq!(pipeline.mode_state().mode, Mode::Live);
    assert_eq!(pipeline.calibration_state(), &FfcState::Idle);
    assert_eq!(pipeline.stats().ffc_failures, 1);
    assert!(pipeline
        .notifications()
        .iter()
        .any(|n| n.text() == "FFC capture failed"));
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_sink_failure_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = NullSink::new();
    sink.fail_next(2);

    let mut pipeline = Pipeline::start(
        replay(),
        sink,
        Box::new(ScriptedButtons::new()),
        memory_stores(dir.path()),
        fast(),
    )
    .unwrap();

    for _ in 0..2 {
        let report = pipeline.run_iteration();
        assert!(matches!(
            report.errors.as_slice(),
            [PipelineError::SinkFailure(_)]
        ));
    }
    assert!(pipeline.run_iteration().is_clean());

    assert_eq!(pipeline.stats().sink_failures, 2);
    assert_eq!(pipeline.stats().frames_processed, 1);
    assert_eq!(pipeline.sink().pushed(), 1);
}

#[test]
fn test_run_stops_at_frame_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = Pipeline::start(
        SyntheticCamera::new(CaptureConfig::default()),
        NullSink::new(),
        Box::new(ScriptedButtons::new()),
        memory_stores(dir.path()),
        PipelineOptions {
            max_frames: Some(5),
            ..fast()
        },
    )
    .unwrap()
    .with_metrics(PipelineMetrics::new().unwrap());

    let stats = pipeline.run(&AtomicBool::new(false));
    assert_eq!(pipeline.iterations(), 5);
    assert_eq!(stats.frames_processed, 5);

    let exposition = pipeline.metrics().unwrap().encode().unwrap();
    assert!(exposition.contains("thermal_viewer_frames_processed_total 5"));
}

#[test]
fn test_cancelled_run_does_no_work() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = Pipeline::start(
        replay(),
        NullSink::new(),
        Box::new(ScriptedButtons::new()),
        memory_stores(dir.path()),
        fast(),
    )
    .unwrap();

    let stats = pipeline.run(&AtomicBool::new(true));
    assert_eq!(pipeline.iterations(), 0);
    assert_eq!(stats.frames_processed, 0);
    assert_eq!(pipeline.sink().pushed(), 0);
}

#[test]
fn test_settings_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let stores = || Stores {
        config: Box::new(FileConfigStore::new(&config_path)),
        profiles: Box::new(DirectoryProfileStore::new(dir.path().join("ffc"))),
    };

    {
        // Next palette, walk to Settings, then toggle units.
        let buttons = ScriptedButtons::new()
            .then(&[Button::Mode, Button::Up])
            .then(&[Button::Mode, Button::Mode, Button::Mode])
            .then(&[Button::Up, Button::Up, Button::Mode]);
        let mut pipeline =
            Pipeline::start(replay(), NullSink::new(), Box::new(buttons), stores(), fast())
                .unwrap();
        for _ in 0..3 {
            pipeline.run_iteration();
        }
        assert_eq!(pipeline.mode_state().mode, Mode::Settings);
    }

    let pipeline = Pipeline::start(
        replay(),
        NullSink::new(),
        Box::new(ScriptedButtons::new()),
        stores(),
        fast(),
    )
    .unwrap();
    let state = pipeline.mode_state();
    assert_eq!(state.palette.index(), 3);
    assert_eq!(state.unit, TemperatureUnit::Fahrenheit);
    assert_eq!(state.mode, Mode::Live);
}
