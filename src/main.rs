use crossbeam_channel::bounded;
use log::info;
use nalgebra::Vector3;
use sand_surface::config::demo::{load_config, DemoConfig, SceneConfig};
use sand_surface::diagnostics::CycleReport;
use sand_surface::geometry::{CoordinateTransform, PlaneEquation};
use sand_surface::image::io::{depth_to_gray, save_gray_png, write_json_file};
use sand_surface::image::{RawDepthFrame, SensorFrame};
use sand_surface::{Resolution, Roi, SurfacePipeline, SurfaceSettings, SurfaceWorker};
use serde::Serialize;
use std::env;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DemoSummary {
    sensor: Resolution,
    roi: Roi,
    frames_sent: usize,
    stabilized: bool,
    last_cycle: Option<CycleReport>,
    center_elevation: Option<f64>,
    max_gradient: f32,
    elapsed_ms: f64,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn usage() -> String {
    "Usage: sand-surface-demo [config.json]".to_string()
}

fn run() -> Result<(), String> {
    let config = match env::args().nth(1) {
        Some(arg) if arg == "-h" || arg == "--help" => return Err(usage()),
        Some(path) => load_config(Path::new(&path))?,
        None => DemoConfig::default(),
    };
    let res = config.sensor.resolution();
    if res.width <= 2 * config.scene.wall_margin || res.height <= 2 * config.scene.wall_margin {
        return Err(format!(
            "wall margin {} leaves no sand in a {} frame",
            config.scene.wall_margin, res
        ));
    }
    let interior = Roi::new(
        config.scene.wall_margin,
        config.scene.wall_margin,
        res.width - config.scene.wall_margin,
        res.height - config.scene.wall_margin,
    );

    let (tx, rx) = bounded::<SensorFrame>(2);
    let pipeline = SurfacePipeline::new(res, interior, config.surface);
    let mut worker = SurfaceWorker::spawn(pipeline, rx);

    let start = Instant::now();
    let feeder = {
        let scene = config.scene.clone();
        let frames = config.frames;
        let period = Duration::from_secs_f64(1.0 / config.fps.max(1.0));
        thread::spawn(move || {
            for i in 0..frames {
                let frame = synthesize(res, &scene, i as u64);
                if tx.send(SensorFrame::depth_only(frame)).is_err() {
                    return i;
                }
                thread::sleep(period);
            }
            frames
        })
    };

    let mut last_cycle = None;
    let mut filtered = None;
    let mut gradient = None;
    let frames_sent = loop {
        if let Some(report) = worker.try_receive_report() {
            last_cycle = Some(report);
        }
        if let Some(f) = worker.try_receive_filtered() {
            filtered = Some(f);
        }
        if let Some(g) = worker.try_receive_gradient() {
            gradient = Some(g);
        }
        if feeder.is_finished() {
            break feeder.join().map_err(|_| "frame source panicked".to_string())?;
        }
        thread::sleep(Duration::from_millis(5));
    };
    // Let the producer finish the frames still queued.
    thread::sleep(Duration::from_millis(50));
    last_cycle = worker.try_receive_report().or(last_cycle);
    filtered = worker.try_receive_filtered().or(filtered);
    gradient = worker.try_receive_gradient().or(gradient);
    let stabilized = worker.is_stabilized();
    worker.shutdown();

    let filtered = filtered.ok_or("no filtered frame was produced")?;
    info!(
        "demo: {} frames, last filtered cycle {} (stabilized={})",
        frames_sent, filtered.cycle, filtered.stabilized
    );

    let floor = PlaneEquation::from_point_normal(
        &Vector3::new(0.0, 0.0, config.scene.floor_depth as f64),
        &Vector3::z(),
    )
    .ok_or("invalid base plane")?;
    let transform = CoordinateTransform::new(config.sensor.model(), floor);
    let center_elevation = transform.elevation_at(
        &filtered.value,
        res.width as f64 * 0.5,
        res.height as f64 * 0.5,
    );
    let max_gradient = gradient
        .map(|g| g.value.cells().iter().map(|c| c.norm()).fold(0.0f32, f32::max))
        .unwrap_or(0.0);

    let summary = DemoSummary {
        sensor: res,
        roi: interior,
        frames_sent,
        stabilized,
        last_cycle,
        center_elevation,
        max_gradient,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    };
    println!("Surface summary");
    println!("  frames: {}", summary.frames_sent);
    println!("  stabilized: {}", summary.stabilized);
    if let Some(e) = summary.center_elevation {
        println!("  center elevation: {e:.1}");
    }
    println!("  max gradient: {:.3}", summary.max_gradient);

    if let Some(path) = &config.output.preview_png {
        let near = config.scene.floor_depth as f32 - config.scene.hill_height * 1.5;
        let gray = depth_to_gray(&filtered.value, near, config.scene.floor_depth as f32);
        save_gray_png(&gray, path).map_err(|e| e.to_string())?;
        println!("Preview written to {}", path.display());
    }
    if let Some(path) = &config.output.report_json {
        write_json_file(path, &summary).map_err(|e| e.to_string())?;
        println!("JSON report written to {}", path.display());
    }
    if let Some(path) = &config.output.settings_json {
        let settings = SurfaceSettings {
            roi: Some(interior),
            averaging_slots: config.surface.temporal.averaging_slots,
            spatial_filtering: config.surface.smoothing.enabled,
            follow_big_changes: config.surface.temporal.follow_big_change,
            max_offset: config.surface.temporal.valid_floor,
            ..SurfaceSettings::default()
        };
        settings.save(path).map_err(|e| e.to_string())?;
        println!("Settings written to {}", path.display());
    }
    Ok(())
}

/// One depth frame of the synthetic sandbox: a hill with a slowly drifting
/// ripple inside the walls, plus deterministic flicker and dropouts.
fn synthesize(res: Resolution, scene: &SceneConfig, t: u64) -> RawDepthFrame {
    let mut frame = RawDepthFrame::filled(res.width, res.height, scene.wall_depth);
    let m = scene.wall_margin;
    let (cx, cy) = (res.width as f32 * 0.5, res.height as f32 * 0.5);
    let radius = (res.width.min(res.height) as f32 * 0.5 - m as f32).max(1.0);
    let phase = t as f32 * 0.02;
    let w = res.width;
    for (i, px) in frame.data_mut().iter_mut().enumerate() {
        let (x, y) = (i % w, i / w);
        if x < m || y < m || x >= res.width - m || y >= res.height - m {
            continue;
        }
        let h = hash(i as u64, t);
        if (h % 10_000) as f32 / 10_000.0 < scene.dropout {
            *px = 0;
            continue;
        }
        let r = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt() / radius;
        let hill = scene.hill_height * (1.0 - r * r).max(0.0);
        let ripple = 3.0 * (x as f32 * 0.15 + phase).sin();
        let span = 2 * scene.flicker as u64 + 1;
        let flicker = ((h >> 16) % span) as f32 - scene.flicker as f32;
        let depth = scene.floor_depth as f32 - hill - ripple + flicker;
        *px = depth.clamp(0.0, u16::MAX as f32) as u16;
    }
    frame
}

/// SplitMix64 of pixel index and frame number.
fn hash(i: u64, t: u64) -> u64 {
    let mut z = i
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(t.wrapping_mul(0xBF58_476D_1CE4_E5B9));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
