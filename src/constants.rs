// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Default pixelation block size in source-texture pixels
pub const DEFAULT_BLOCK_SIZE: f32 = 10.0;

/// Smallest accepted block size. Values at or below zero are clamped
/// here instead of reaching the shader as a division by zero.
pub const MIN_BLOCK_SIZE: f32 = 1.0;

/// Bounded wait for a snapshot request to be serviced by the render
/// context before failing with a timeout
pub const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default synthetic capture geometry
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;

/// Default synthetic capture rate (frames per second)
pub const DEFAULT_CAPTURE_FPS: u32 = 30;

/// Render tick rate used by the demo runner (display refresh stand-in)
pub const DEFAULT_TICK_HZ: u32 = 60;

/// Texture readback rows must be aligned to this many bytes
pub const READBACK_ROW_ALIGN: u32 = 256;

/// Bounded wait for the GPU to complete a snapshot readback. Shorter
/// than [`SNAPSHOT_TIMEOUT`] so a wedged device fails the request
/// before the caller's own wait expires.
pub const READBACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Clamp a requested block size to the valid range
pub fn clamp_block_size(size: f32) -> f32 {
    if !size.is_finite() {
        return DEFAULT_BLOCK_SIZE;
    }
    size.max(MIN_BLOCK_SIZE)
}
