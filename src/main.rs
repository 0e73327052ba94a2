//! Thermal Viewer CLI
//!
//! Runs the viewer against the synthetic camera, drawing to a framebuffer
//! panel or nowhere. Button presses are read from stdin
//! as `m`, `u` and `d` lines.

use clap::{Parser, ValueEnum};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thermal_viewer::{
    calibration::DirectoryProfileStore,
    capture::{CameraType, CaptureConfig, FrameSource, SyntheticCamera},
    config::{default_config_dir, ConfigStore, FileConfigStore},
    input::ChannelButtons,
    metrics::PipelineMetrics,
    modes::Button,
    output::{FrameSink, FramebufferSink, NullSink, Orientation, Rotation},
    pipeline::{Pipeline, PipelineError, PipelineOptions, Stores},
    processing::Palette,
};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DisplayKind {
    /// Waveshare 2.4" panel through the Linux framebuffer.
    Waveshare,
    /// No display; frames are dropped.
    #[value(name = "none")]
    Headless,
}

#[derive(Debug, Parser)]
#[command(name = "thermal-viewer", version, about = "Thermal camera viewer")]
struct Args {
    /// Camera model; overrides the saved config.
    #[arg(long)]
    camera: Option<CameraType>,

    /// Use the built-in synthetic camera.
    #[arg(long)]
    synthetic: bool,

    /// Palette index (0-21) or name; overrides the saved config.
    #[arg(long, value_parser = parse_palette)]
    colormap: Option<Palette>,

    /// Display rotation in degrees.
    #[arg(long, default_value = "0")]
    rotate: Rotation,

    /// Mirror the display horizontally.
    #[arg(long)]
    flip: bool,

    /// Flat-field profile to load.
    #[arg(long, conflicts_with = "no_ffc")]
    ffc_path: Option<PathBuf>,

    /// Start without any flat-field correction.
    #[arg(long)]
    no_ffc: bool,

    /// Capture a new flat-field profile right after startup.
    #[arg(long)]
    capture_ffc: bool,

    /// Directory holding flat-field profiles.
    #[arg(long)]
    ffc_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DisplayKind::Waveshare)]
    display: DisplayKind,

    /// Framebuffer device backing the panel.
    #[arg(long, default_value = "/dev/fb1")]
    fb_device: PathBuf,

    #[arg(long, default_value_t = 240)]
    lcd_width: u32,

    #[arg(long, default_value_t = 320)]
    lcd_height: u32,

    /// Target frame rate.
    #[arg(long, default_value_t = 9)]
    fps: u32,

    /// Config file path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write Prometheus metrics here on exit.
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
}

fn parse_palette(s: &str) -> Result<Palette, String> {
    match s.parse::<usize>() {
        Ok(index) => Palette::from_index(index)
            .ok_or_else(|| format!("palette index must be 0-{}", Palette::ALL.len() - 1)),
        Err(_) => Palette::from_name(s).ok_or_else(|| format!("unknown palette: {s}")),
    }
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Thermal Viewer v{}", thermal_viewer::VERSION);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), PipelineError> {
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst)) {
            warn!(error = %e, "Ctrl-C handler not installed");
        }
    }

    let config_store = match &args.config {
        Some(path) => FileConfigStore::new(path),
        None => FileConfigStore::default_location(),
    };
    let camera_type = args
        .camera
        .unwrap_or_else(|| config_store.load_or_default().camera_type);

    let camera = open_camera(&args, camera_type)?;
    let sink = open_display(&args)?;

    let (tx, buttons) = ChannelButtons::channel();
    spawn_stdin_reader(tx);
    let ffc_dir = args
        .ffc_dir
        .clone()
        .unwrap_or_else(|| default_config_dir().join("ffc"));
    let stores = Stores {
        config: Box::new(config_store),
        profiles: Box::new(DirectoryProfileStore::new(ffc_dir)),
    };

    let options = PipelineOptions {
        camera_type: args.camera,
        palette: args.colormap,
        ffc_path: args.ffc_path.clone(),
        load_ffc: !args.no_ffc,
        capture_ffc: args.capture_ffc,
        orientation: Orientation::new(args.rotate, args.flip),
        fps: args.fps,
        max_frames: args.frames,
        ..PipelineOptions::default()
    };

    let mut pipeline = Pipeline::start(camera, sink, Box::new(buttons), stores, options)?;
    match PipelineMetrics::new() {
        Ok(metrics) => pipeline = pipeline.with_metrics(metrics),
        Err(e) => warn!(error = %e, "Metrics unavailable"),
    }

    let stats = pipeline.run(&cancel);
    info!(
        frames = stats.frames_processed,
        acquisition_failures = stats.acquisition_failures,
        sink_failures = stats.sink_failures,
        overruns = stats.budget_overruns,
        "Run finished"
    );

    if let Err(e) = pipeline.shutdown() {
        warn!(error = %e, "Shutdown incomplete");
    }
    if let (Some(path), Some(metrics)) = (&args.metrics_file, pipeline.metrics()) {
        match metrics.write_to(path) {
            Ok(()) => info!(path = %path.display(), "Metrics written"),
            Err(e) => warn!(path = %path.display(), error = %e, "Metrics not written"),
        }
    }
    Ok(())
}

fn open_display(args: &Args) -> Result<Box<dyn FrameSink>, PipelineError> {
    match args.display {
        DisplayKind::Headless => Ok(Box::new(NullSink::new())),
        DisplayKind::Waveshare => {
            FramebufferSink::open(&args.fb_device, args.lcd_width, args.lcd_height)
                .map(|sink| Box::new(sink) as Box<dyn FrameSink>)
                .map_err(|e| PipelineError::FatalOpenFailure {
                    device: "display",
                    reason: e.to_string(),
                })
        }
    }
}

fn open_camera(
    args: &Args,
    camera_type: CameraType,
) -> Result<Box<dyn FrameSource>, PipelineError> {
    if !args.synthetic {
        return Err(PipelineError::FatalOpenFailure {
            device: "camera",
            reason: "no sensor driver is built in; rerun with --synthetic".to_string(),
        });
    }
    let config = synthetic_config(camera_type, args.fps);
    config
        .validate()
        .map_err(|e| PipelineError::FatalOpenFailure {
            device: "camera",
            reason: e.to_string(),
        })?;
    Ok(Box::new(SyntheticCamera::new(config)))
}

/// Synthetic frames at the native size of `camera_type`, so profiles
/// captured against them carry the right tag and dimensions.
fn synthetic_config(camera_type: CameraType, fps: u32) -> CaptureConfig {
    CaptureConfig {
        fps,
        ..CaptureConfig::for_camera(camera_type)
    }
}

/// Forwards `m`/`u`/`d` lines from stdin as button presses.
fn spawn_stdin_reader(tx: std::sync::mpsc::Sender<Button>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Button>() {
                Ok(button) => {
                    if tx.send(button).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Ignoring input"),
            }
        }
    });
}
