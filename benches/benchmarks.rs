// benches/benchmarks.rs -- Per-stage and full-step benchmarks.
//
//   cargo bench

use criterion::{criterion_group, criterion_main, Criterion};

use sparseflow::align::{PatchAligner, PyramidalLk};
use sparseflow::config::TrackerConfig;
use sparseflow::detect::{CandidateDetector, HarrisDetector};
use sparseflow::geometry::Point2;
use sparseflow::image::Image;
use sparseflow::pyramid::Pyramid;
use sparseflow::select::select;
use sparseflow::session::Tracker;
use sparseflow::subpix::GradientRefiner;

// ============================================================
// Helpers
// ============================================================

/// Synthetic scene: intensity gradient plus bright rectangles, shifted
/// as a whole by (dx, dy).
fn make_scene(w: usize, h: usize, dx: usize, dy: usize) -> Image<u8> {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let sx = x + dx;
            let sy = y + dy;
            img.set(x, y, ((sx * 120 / w) + (sy * 40 / h)) as u8);
        }
    }
    for rect in 0..6usize {
        let rx = (60 + (rect % 3) * 200 + dx).min(w - 1);
        let ry = (50 + (rect / 3) * 200 + dy).min(h - 1);
        let bright = 180 + rect as u8 * 10;
        for y in ry..(ry + 40).min(h) {
            for x in rx..(rx + 50).min(w) {
                img.set(x, y, bright);
            }
        }
    }
    img
}

// ============================================================
// Per-stage benchmarks
// ============================================================

fn bench_detect(c: &mut Criterion) {
    let frame = make_scene(640, 480, 0, 0);
    let window = frame.sub_image(100, 100, 51, 51);
    let det = HarrisDetector::new(5);

    let mut group = c.benchmark_group("detect");
    group.bench_function("frame_640x480", |b| b.iter(|| det.detect(&frame, 270)));
    group.bench_function("window_51x51", |b| b.iter(|| det.detect(&window, 7)));
    group.finish();
}

fn bench_pyramid(c: &mut Criterion) {
    let patch = make_scene(640, 480, 0, 0).sub_image(100, 100, 11, 11);

    let mut group = c.benchmark_group("pyramid");
    group.bench_function("patch_11x11", |b| b.iter(|| Pyramid::build(&patch, 4, 3)));
    group.finish();
}

fn bench_align(c: &mut Criterion) {
    let prev = make_scene(640, 480, 0, 0).sub_image(95, 95, 11, 11);
    let curr = make_scene(640, 480, 2, 1).sub_image(95, 95, 11, 11);
    let aligner = PyramidalLk::default();
    let center = Point2::new(5.0, 5.0);

    let mut group = c.benchmark_group("align");
    group.bench_function("patch_pair_11x11", |b| {
        b.iter(|| aligner.align(&prev, &curr, center))
    });
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let frame = make_scene(640, 480, 0, 0);
    let config = TrackerConfig::default();
    let det = HarrisDetector::new(config.suppression_window);
    let refiner = GradientRefiner::new(config.suppression_window);

    let mut group = c.benchmark_group("select");
    group.bench_function("9pt_640x480", |b| {
        b.iter(|| select(&frame, &config, &det, &refiner, 270))
    });
    group.finish();
}

// ============================================================
// Full step
// ============================================================

fn bench_step(c: &mut Criterion) {
    let prev = make_scene(640, 480, 0, 0);
    let curr = make_scene(640, 480, 3, 2);
    let tracker = Tracker::new(TrackerConfig::default()).unwrap();

    // Seed once outside the timed loop; the steady-state step reuses the
    // previous step's point set.
    let seeded = tracker.step(&prev, &prev, Vec::new(), true).unwrap();

    let mut group = c.benchmark_group("step");
    group.bench_function("seed_and_step_640x480", |b| {
        b.iter(|| tracker.step(&prev, &curr, Vec::new(), true))
    });
    group.bench_function("steady_step_640x480", |b| {
        b.iter(|| tracker.step(&prev, &curr, seeded.curr_points.clone(), false))
    });
    group.finish();
}

// ============================================================
// Register
// ============================================================

criterion_group!(
    benches,
    bench_detect,
    bench_pyramid,
    bench_align,
    bench_select,
    bench_step,
);
criterion_main!(benches);
