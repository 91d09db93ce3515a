// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the pipeline
//!
//! This module provides command-line functionality for:
//! - Running the pipeline against the synthetic capture source
//! - Saving a snapshot of the displayed (post-effect) image
//! - Persisting configuration defaults

use chrono::Local;
use pixelize::capture::CaptureSink;
use pixelize::capture::synthetic::SyntheticSource;
use pixelize::render::effect::{EffectControls, EffectState};
use pixelize::{Config, FrameChannel, RenderLoop, SnapshotHandle, gpu};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

pub struct RunOptions {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_secs: Option<u64>,
    pub pixelate: bool,
    pub block_size: f32,
    pub snapshot: bool,
    pub output: Option<PathBuf>,
}

/// Run the full pipeline: synthetic capture -> conversion -> channel ->
/// render loop, ticking at the display rate until the duration elapses or
/// Ctrl-C is pressed.
pub fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    let (device, queue, gpu_info) = pollster::block_on(gpu::create_render_device("pixelize"))?;
    println!(
        "GPU: {} ({})",
        gpu_info.adapter_name, gpu_info.backend
    );

    let channel = Arc::new(FrameChannel::new());
    let sink = Arc::new(CaptureSink::new(channel.clone()));
    let controls = Arc::new(EffectControls::new(EffectState {
        enabled: options.pixelate,
        block_size: options.block_size,
    }));

    let mut render = RenderLoop::new(device, queue, channel, controls.clone())?;
    render.surface_created(options.width, options.height)?;

    let source = {
        let _guard = runtime.enter();
        SyntheticSource::spawn(sink.clone(), options.width, options.height, options.fps)
    };

    println!(
        "Running {}x{} @ {}fps, pixelate={} block={} (press Ctrl+C to stop)",
        options.width, options.height, options.fps, options.pixelate, options.block_size
    );

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let tick_interval = Duration::from_secs(1) / pixelize::constants::DEFAULT_TICK_HZ;
    let deadline = options
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));

    while !stop_flag.load(Ordering::SeqCst) {
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            break;
        }
        let tick_started = Instant::now();
        render.tick()?;
        let elapsed = tick_started.elapsed();
        if elapsed < tick_interval {
            std::thread::sleep(tick_interval - elapsed);
        }
    }

    if options.snapshot {
        let handle = render.snapshot_handle();
        save_snapshot(&mut render, handle, options.output)?;
    }

    // Shutdown order: stop producing, quiesce the capture side, then
    // release GPU resources.
    let frames_published = runtime.block_on(source.stop());
    sink.stop();
    render.teardown();

    info!(
        frames_published,
        frames_presented = render.frames_presented(),
        frames_dropped = sink.frames_dropped(),
        "pipeline stopped"
    );
    println!("Presented {} frames", render.frames_presented());

    Ok(())
}

/// Request a snapshot while keeping the render loop ticking, then write
/// it out as a PNG.
fn save_snapshot(
    render: &mut RenderLoop,
    handle: SnapshotHandle,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    // The readback runs on the render context, so the capture request must
    // come from another thread while this one keeps ticking.
    let request = std::thread::spawn(move || handle.capture());

    while !request.is_finished() {
        render.tick()?;
        std::thread::sleep(Duration::from_millis(5));
    }
    let frame = request
        .join()
        .map_err(|_| "snapshot thread panicked")??;

    let output_path = if let Some(path) = output {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        path
    } else {
        let dir = get_default_snapshot_dir();
        std::fs::create_dir_all(&dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        dir.join(format!("snapshot_{}.png", timestamp))
    };

    let image = image::RgbaImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("snapshot buffer does not match its dimensions")?;
    image.save(&output_path)?;

    println!("Snapshot saved: {}", output_path.display());
    Ok(())
}

/// Persist the given settings (merged over the current config) as the new
/// defaults.
pub fn configure(
    current: Config,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    pixelate: Option<bool>,
    block_size: Option<f32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config {
        effect_enabled: pixelate.unwrap_or(current.effect_enabled),
        block_size: block_size.unwrap_or(current.block_size),
        capture_width: width.unwrap_or(current.capture_width),
        capture_height: height.unwrap_or(current.capture_height),
        capture_fps: fps.unwrap_or(current.capture_fps),
    }
    .sanitized();

    config.save()?;
    println!(
        "Saved defaults: {}x{} @ {}fps, pixelate={} block={}",
        config.capture_width,
        config.capture_height,
        config.capture_fps,
        config.effect_enabled,
        config.block_size
    );
    Ok(())
}

/// Default folder for saved snapshots
fn get_default_snapshot_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("pixelize")
}
