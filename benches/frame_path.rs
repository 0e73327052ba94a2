use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use thermal_viewer::capture::{
    CameraType, CaptureConfig, FrameSource, RawFrame, SyntheticCamera,
};
use thermal_viewer::modes::ModeState;
use thermal_viewer::output::{Orientation, Rotation};
use thermal_viewer::overlay::{OverlayRenderer, Readout};
use thermal_viewer::processing::{
    extrema, highlight, tint, Comparator, HotColdDetector, Palette, TemperatureConverter,
};

fn synthetic_frame(camera_type: CameraType) -> RawFrame {
    let mut camera = SyntheticCamera::new(CaptureConfig::for_camera(camera_type));
    camera.open(camera_type, None).expect("synthetic camera opens");
    camera.read().expect("synthetic frame")
}

fn benchmark_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion");

    for camera_type in [CameraType::Seek, CameraType::SeekPro] {
        let raw = synthetic_frame(camera_type);
        let mut converter = TemperatureConverter::new(camera_type);
        group.bench_with_input(BenchmarkId::from_parameter(camera_type), &raw, |b, raw| {
            b.iter(|| converter.convert(black_box(raw), false));
        });
    }

    group.finish();
}

fn benchmark_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    let raw = synthetic_frame(CameraType::SeekPro);
    let frame = TemperatureConverter::new(CameraType::SeekPro)
        .convert(&raw, false)
        .frame;

    group.bench_function("palette_inferno", |b| {
        b.iter(|| Palette::Inferno.apply(black_box(&frame)));
    });

    group.bench_function("threshold_highlight", |b| {
        let mut image = Palette::Gray.apply(&frame);
        b.iter(|| {
            let found = highlight(black_box(&frame), 30.0, Comparator::Greater);
            tint(&mut image, &found.mask, Comparator::Greater.highlight_color(), 0.6);
        });
    });

    group.bench_function("hot_cold_detect", |b| {
        let detector = HotColdDetector::default();
        b.iter(|| detector.detect(black_box(&frame)));
    });

    group.finish();
}

fn benchmark_presentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("presentation");
    let raw = synthetic_frame(CameraType::SeekPro);
    let frame = TemperatureConverter::new(CameraType::SeekPro)
        .convert(&raw, false)
        .frame;
    let image = Palette::Gray.apply(&frame);
    let state = ModeState::default();

    group.bench_function("overlay_render", |b| {
        let renderer = OverlayRenderer::new();
        let found = highlight(&frame, state.threshold_c, state.comparator);
        let readout = Readout::Threshold {
            matched: &found,
            extrema: extrema(&frame),
        };
        b.iter(|| {
            let mut canvas = image.clone();
            renderer.render(&mut canvas, &state, readout, Some("Live Mode"));
            canvas
        });
    });

    group.bench_function("rotate_quarter", |b| {
        let orientation = Orientation::new(Rotation::Quarter, true);
        b.iter(|| orientation.apply(black_box(image.clone())));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_conversion,
    benchmark_stages,
    benchmark_presentation
);
criterion_main!(benches);
