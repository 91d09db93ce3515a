// SPDX-License-Identifier: GPL-3.0-only

//! Pixelize - live camera pixelation pipeline
//!
//! This library provides the core pipeline for the Pixelize application:
//! camera frames come in as YUV420, get converted to RGBA on the CPU, are
//! handed to the render context through a latest-wins channel, and are
//! drawn through a mosaic shader into a display target that snapshots can
//! read back.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`frame`]: Frame buffers, color conversion, and the frame channel
//! - [`capture`]: Capture-side frame ingestion and the synthetic source
//! - [`gpu`]: Device and queue acquisition
//! - [`render`]: Render loop, effect pipeline, texture cache, snapshots
//! - [`config`]: User configuration handling

pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame;
pub mod gpu;
pub mod render;

// Re-export commonly used types
pub use capture::CaptureSink;
pub use config::Config;
pub use errors::{CaptureError, GpuError, PipelineError, PipelineResult, SnapshotError};
pub use frame::channel::FrameChannel;
pub use frame::{FrameBuffer, FrameFormat};
pub use render::effect::{EffectControls, EffectState};
pub use render::snapshot::SnapshotHandle;
pub use render::{RenderLoop, SurfaceState};
