// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic YUV420 test-pattern source
//!
//! Stands in for the excluded device layer: pushes a moving gradient into
//! a [`CaptureSink`] at a fixed rate so the demo runner and the
//! concurrency tests can exercise the full capture-to-render path without
//! camera hardware.

use crate::capture::{CaptureSink, RawFrame};
use crate::frame::FrameFormat;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Handle to a running test-pattern producer task
pub struct SyntheticSource {
    stop: Arc<AtomicBool>,
    task: JoinHandle<u64>,
}

impl SyntheticSource {
    /// Spawn a producer pushing `fps` frames per second of `width`x`height`
    /// moving-gradient YUV420 into the sink. Must be called inside a tokio
    /// runtime.
    pub fn spawn(sink: Arc<CaptureSink>, width: u32, height: u32, fps: u32) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut produced: u64 = 0;
            let mut buffer = vec![0u8; plane_bytes(width, height)];

            tracing::info!(width, height, fps, "synthetic capture source started");

            while !stop_flag.load(Ordering::Acquire) {
                interval.tick().await;
                fill_test_pattern(&mut buffer, width, height, produced);
                let raw = RawFrame {
                    data: &buffer,
                    width,
                    height,
                    stride: width,
                    format: FrameFormat::Yuv420Planar,
                    timestamp: Instant::now(),
                };
                // A full pattern is always well-formed; the only failure
                // left is a disconnected sink, which ends production
                if let Err(crate::errors::CaptureError::Disconnected) = sink.ingest(raw) {
                    tracing::warn!("capture sink disconnected, stopping producer");
                    break;
                }
                produced += 1;
            }

            tracing::info!(produced, "synthetic capture source stopped");
            produced
        });

        Self { stop, task }
    }

    /// Signal the producer to stop and wait for it, returning the number
    /// of frames it produced.
    pub async fn stop(self) -> u64 {
        self.stop.store(true, Ordering::Release);
        self.task.await.unwrap_or(0)
    }
}

fn plane_bytes(width: u32, height: u32) -> usize {
    (width as usize * height as usize) + 2 * (width as usize / 2) * (height as usize / 2)
}

/// Moving diagonal luma gradient with slowly rotating chroma
fn fill_test_pattern(buffer: &mut [u8], width: u32, height: u32, tick: u64) {
    let w = width as usize;
    let h = height as usize;
    let phase = (tick % 256) as usize;

    let (y_plane, chroma) = buffer.split_at_mut(w * h);
    for row in 0..h {
        for col in 0..w {
            y_plane[row * w + col] = ((row + col + phase) % 256) as u8;
        }
    }

    let cw = w / 2;
    let ch = h / 2;
    let (u_plane, v_plane) = chroma.split_at_mut(cw * ch);
    for row in 0..ch {
        for col in 0..cw {
            u_plane[row * cw + col] = ((col * 2 + phase) % 256) as u8;
            v_plane[row * cw + col] = ((row * 2 + 255 - phase) % 256) as u8;
        }
    }
}
