// demos/track_sequence.rs
//
// Run the sparse-flow tracker over a directory of grayscale PNG frames.
//
// Usage:
//   cargo run --example track_sequence --release -- /path/to/frames [max_frames]
//
// Frames are processed in sorted filename order. Set RUST_LOG=debug for
// per-step tracker diagnostics.
//
// Output:
//   vis_output/flow_stats.csv      — per-step statistics
//   vis_output/flow_tracks.svg     — point tracks overlaid on last frame
//   stdout                         — per-step summary

use sparseflow::config::TrackerConfig;
use sparseflow::error::TrackError;
use sparseflow::geometry::Point2;
use sparseflow::image::Image;
use sparseflow::session::Tracker;

use std::env;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <frame_directory> [max_frames]", args[0]);
        std::process::exit(1);
    }

    let frame_dir = PathBuf::from(&args[1]);
    let max_frames: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(usize::MAX);

    let files = list_png_files(&frame_dir);
    if files.len() < 2 {
        eprintln!("Error: need at least 2 PNG frames in {}", frame_dir.display());
        std::process::exit(1);
    }
    let num_frames = files.len().min(max_frames);
    println!("Frames: {} (processing {})", files.len(), num_frames);

    let config = TrackerConfig::default();
    println!(
        "Config: points={}, max_shift={}px, search_radius={}px, margin={}px",
        config.num_tracked_points,
        config.max_expected_shift,
        config.search_radius(),
        config.border_margin(),
    );
    let tracker = match Tracker::new(config) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut stats_csv = String::from("step,reseeded,mean_flow_x,mean_flow_y,max_flow\n");
    fs::create_dir_all("vis_output").ok();

    println!("\n{:>5}  {:>6}  {:>9}  {:>9}  {:>8}", "step", "reseed", "mean_fx", "mean_fy", "max_flow");
    println!("{}", "-".repeat(44));

    // Per-slot track polylines; a reseed closes the active set and starts
    // a fresh one.
    let mut finished_tracks: Vec<Vec<(f32, f32)>> = Vec::new();
    let mut active_tracks: Vec<Vec<(f32, f32)>> = Vec::new();

    let mut points: Vec<Point2> = Vec::new();
    let mut force_reseed = true;
    let mut prev_frame = load_grayscale(&frame_dir.join(&files[0]));

    for step in 0..(num_frames - 1) {
        let curr_frame = load_grayscale(&frame_dir.join(&files[step + 1]));
        let passed = points.clone();

        match tracker.step(&prev_frame, &curr_frame, points, force_reseed) {
            Ok(result) => {
                let reseeded = force_reseed || result.prev_points != passed;
                if reseeded {
                    finished_tracks.append(&mut active_tracks);
                    active_tracks = result
                        .prev_points
                        .iter()
                        .map(|p| vec![(p.x, p.y)])
                        .collect();
                }
                for (track, p) in active_tracks.iter_mut().zip(&result.curr_points) {
                    track.push((p.x, p.y));
                }

                let n = result.flow.len() as f32;
                let mean_x: f32 = result.flow.iter().map(|f| f.x).sum::<f32>() / n;
                let mean_y: f32 = result.flow.iter().map(|f| f.y).sum::<f32>() / n;
                let max_flow = result
                    .flow
                    .iter()
                    .map(|f| f.x.abs().max(f.y.abs()))
                    .fold(0.0f32, f32::max);

                println!(
                    "{:5}  {:>6}  {:9.2}  {:9.2}  {:8.2}",
                    step,
                    if reseeded { "yes" } else { "" },
                    mean_x,
                    mean_y,
                    max_flow
                );
                writeln!(
                    stats_csv,
                    "{},{},{:.3},{:.3},{:.3}",
                    step, reseeded as u8, mean_x, mean_y, max_flow
                )
                .unwrap();

                points = result.curr_points;
                force_reseed = false;
            }
            Err(TrackError::TrackingDegraded) => {
                println!("{step:5}  degraded, reseeding on next pair");
                finished_tracks.append(&mut active_tracks);
                points = Vec::new();
                force_reseed = true;
            }
            Err(e) => {
                eprintln!("step {step}: {e}");
                std::process::exit(1);
            }
        }

        prev_frame = curr_frame;
    }

    fs::write("vis_output/flow_stats.csv", &stats_csv).unwrap();
    println!("\nStats saved to vis_output/flow_stats.csv");

    finished_tracks.append(&mut active_tracks);
    let svg = render_tracks(&prev_frame, &finished_tracks, num_frames);
    fs::write("vis_output/flow_tracks.svg", &svg).unwrap();
    println!("Track visualization saved to vis_output/flow_tracks.svg");

    let longest = finished_tracks.iter().map(|t| t.len()).max().unwrap_or(0);
    println!("\nTrack summary:");
    println!("  Track segments: {}", finished_tracks.len());
    println!("  Longest track: {} frames", longest);
}

/// List .png files in a directory, sorted.
fn list_png_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", dir.display()))
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            if name.ends_with(".png") {
                Some(name)
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

/// Load a PNG as a grayscale Image<u8>.
fn load_grayscale(path: &Path) -> Image<u8> {
    let img = image::open(path)
        .unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display()));
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();
    Image::from_vec(w as usize, h as usize, gray.into_raw())
}

// ---------------------------------------------------------------------------
// SVG track visualization
// ---------------------------------------------------------------------------

/// Render point tracks overlaid on the last frame.
fn render_tracks(img: &Image<u8>, tracks: &[Vec<(f32, f32)>], total_frames: usize) -> String {
    let w = img.width();
    let h = img.height();
    let total_h = h + 40;

    let mut svg = String::new();
    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {} {}\" width=\"{}\" height=\"{}\">",
        w, total_h, w, total_h
    )
    .unwrap();
    writeln!(svg, "<style>text {{ font-family: monospace; font-size: 12px; fill: #ddd; }}</style>").unwrap();

    // Background: last frame, rows run-length encoded into rects.
    writeln!(svg, "<g opacity=\"0.6\">").unwrap();
    for y in 0..h {
        let mut x = 0;
        while x < w {
            let v = img.get(x, y);
            let mut run = 1;
            while x + run < w && img.get(x + run, y) == v {
                run += 1;
            }
            if v != 0 {
                writeln!(
                    svg,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"1\" fill=\"rgb({v},{v},{v})\"/>",
                    x, y, run
                )
                .unwrap();
            }
            x += run;
        }
    }
    writeln!(svg, "</g>").unwrap();

    for (i, pts) in tracks.iter().enumerate() {
        if pts.len() < 2 {
            continue;
        }
        let hue = ((i * 137) % 360) as f32;
        let (r, g, b) = hsv_to_rgb(hue, 0.8, 1.0);

        write!(svg, "<polyline points=\"").unwrap();
        for (x, y) in pts {
            write!(svg, "{x:.1},{y:.1} ").unwrap();
        }
        writeln!(
            svg,
            "\" fill=\"none\" stroke=\"rgb({r},{g},{b})\" stroke-width=\"1\" opacity=\"0.9\"/>"
        )
        .unwrap();

        let (lx, ly) = pts.last().unwrap();
        writeln!(
            svg,
            "<circle cx=\"{lx:.1}\" cy=\"{ly:.1}\" r=\"2\" fill=\"rgb({r},{g},{b})\"/>"
        )
        .unwrap();
    }

    writeln!(svg, "<rect x=\"0\" y=\"{h}\" width=\"{w}\" height=\"40\" fill=\"#222\"/>").unwrap();
    writeln!(
        svg,
        "<text x=\"10\" y=\"{}\">Track segments: {} | {} frames processed</text>",
        h + 24,
        tracks.len(),
        total_frames
    )
    .unwrap();

    writeln!(svg, "</svg>").unwrap();
    svg
}

/// HSV to RGB conversion for track coloring.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h as u32) / 60 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
