// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the pixelation pipeline

use std::fmt;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Main pipeline error type
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Capture-side errors (malformed frames, device loss)
    Capture(CaptureError),
    /// GPU resource and shader errors
    Gpu(GpuError),
    /// Snapshot readback errors
    Snapshot(SnapshotError),
    /// Configuration errors
    Config(String),
}

/// Capture-side errors
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Frame byte length is inconsistent with its declared dimensions/format.
    /// The frame is dropped; the pipeline continues with the previous frame.
    MalformedFrame(String),
    /// The capture source lost its underlying device. The sink stops
    /// consuming and awaits a caller-driven restart.
    Disconnected,
}

/// GPU resource errors
#[derive(Debug, Clone)]
pub enum GpuError {
    /// No suitable GPU adapter found
    AdapterNotFound(String),
    /// Device creation failed
    DeviceRequest(String),
    /// Texture or buffer allocation failed (out of memory, context lost)
    ResourceAllocation(String),
    /// Shader compilation or pipeline creation failed. Fatal at
    /// construction time; rendering is never attempted with an invalid
    /// program.
    ShaderCompile(String),
}

/// Snapshot capture errors
#[derive(Debug, Clone)]
pub enum SnapshotError {
    /// Snapshot requested before any frame was rendered
    NoFrameAvailable,
    /// The render context did not service the request within the bounded wait
    Timeout,
    /// GPU readback failed
    ReadbackFailed(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Capture(e) => write!(f, "Capture error: {}", e),
            PipelineError::Gpu(e) => write!(f, "GPU error: {}", e),
            PipelineError::Snapshot(e) => write!(f, "Snapshot error: {}", e),
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::MalformedFrame(msg) => write!(f, "Malformed frame: {}", msg),
            CaptureError::Disconnected => write!(f, "Capture source disconnected"),
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::AdapterNotFound(msg) => write!(f, "No GPU adapter: {}", msg),
            GpuError::DeviceRequest(msg) => write!(f, "Device creation failed: {}", msg),
            GpuError::ResourceAllocation(msg) => write!(f, "Resource allocation failed: {}", msg),
            GpuError::ShaderCompile(msg) => write!(f, "Shader compilation failed: {}", msg),
        }
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::NoFrameAvailable => write!(f, "No frame rendered yet"),
            SnapshotError::Timeout => write!(f, "Render context did not respond in time"),
            SnapshotError::ReadbackFailed(msg) => write!(f, "Readback failed: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for GpuError {}
impl std::error::Error for SnapshotError {}

impl From<CaptureError> for PipelineError {
    fn from(err: CaptureError) -> Self {
        PipelineError::Capture(err)
    }
}

impl From<GpuError> for PipelineError {
    fn from(err: GpuError) -> Self {
        PipelineError::Gpu(err)
    }
}

impl From<SnapshotError> for PipelineError {
    fn from(err: SnapshotError) -> Self {
        PipelineError::Snapshot(err)
    }
}
