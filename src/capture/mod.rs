// SPDX-License-Identifier: GPL-3.0-only

//! Capture-side ingest boundary
//!
//! The capture subsystem (device negotiation, permissions) lives outside
//! this crate; it pushes raw frames into a [`CaptureSink`], which
//! validates them, converts YUV to RGBA in the capture context, and
//! publishes the result to the [`FrameChannel`]. The sink never blocks on
//! the render side.

pub mod synthetic;

use crate::errors::CaptureError;
use crate::frame::channel::FrameChannel;
use crate::frame::convert::yuv420_to_rgba;
use crate::frame::{FrameBuffer, FrameFormat};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// A raw frame as delivered by the capture source (push-only)
#[derive(Debug)]
pub struct RawFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: FrameFormat,
    pub timestamp: Instant,
}

/// Push-only entry point from the capture context into the pipeline
#[derive(Debug)]
pub struct CaptureSink {
    channel: Arc<FrameChannel>,
    running: AtomicBool,
    disconnected: AtomicBool,
    frames_dropped: AtomicU64,
}

impl CaptureSink {
    pub fn new(channel: Arc<FrameChannel>) -> Self {
        Self {
            channel,
            running: AtomicBool::new(true),
            disconnected: AtomicBool::new(false),
            frames_dropped: AtomicU64::new(0),
        }
    }

    /// Ingest one raw frame: validate, convert to RGBA if needed, publish.
    ///
    /// A malformed frame is dropped and reported; the pipeline continues
    /// with the previous frame. After [`mark_disconnected`] every ingest
    /// fails with [`CaptureError::Disconnected`] so the producer sees the
    /// device loss; frames arriving after an orderly [`stop`] are silently
    /// ignored.
    ///
    /// [`stop`]: CaptureSink::stop
    /// [`mark_disconnected`]: CaptureSink::mark_disconnected
    pub fn ingest(&self, raw: RawFrame<'_>) -> Result<(), CaptureError> {
        if self.disconnected.load(Ordering::Acquire) {
            return Err(CaptureError::Disconnected);
        }
        if !self.running.load(Ordering::Acquire) {
            return Ok(());
        }

        let result = match raw.format {
            FrameFormat::Yuv420Planar => {
                FrameBuffer::yuv420(raw.width, raw.height, raw.stride, raw.data.to_vec())
                    .and_then(|frame| yuv420_to_rgba(&frame))
            }
            FrameFormat::Rgba8 => {
                FrameBuffer::rgba8(raw.width, raw.height, raw.stride, raw.data.to_vec())
            }
        };

        match result {
            Ok(frame) => {
                self.channel.publish(frame.with_captured_at(raw.timestamp));
                Ok(())
            }
            Err(err) => {
                let dropped = self.frames_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    %err,
                    dropped,
                    width = raw.width,
                    height = raw.height,
                    "dropping malformed capture frame"
                );
                Err(err)
            }
        }
    }

    /// Quiesce the capture side: further `ingest` calls become no-ops and
    /// any pending frame is discarded. Must happen before GPU teardown so
    /// no publish races a dead renderer.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.channel.drain();
        tracing::info!("capture sink stopped");
    }

    /// Record loss of the underlying device. The sink stops consuming;
    /// restart policy belongs to the caller.
    pub fn mark_disconnected(&self) {
        self.disconnected.store(true, Ordering::Release);
        tracing::warn!("capture source disconnected");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.disconnected.load(Ordering::Acquire)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    /// Frames rejected as malformed since construction
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn channel(&self) -> &Arc<FrameChannel> {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yuv_raw(data: &[u8], width: u32, height: u32) -> RawFrame<'_> {
        RawFrame {
            data,
            width,
            height,
            stride: width,
            format: FrameFormat::Yuv420Planar,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_ingest_converts_and_publishes() {
        let channel = Arc::new(FrameChannel::new());
        let sink = CaptureSink::new(channel.clone());

        let data = vec![128u8; 4 * 4 + 2 * 4];
        sink.ingest(yuv_raw(&data, 4, 4)).unwrap();

        let frame = channel.try_take().expect("frame published");
        assert_eq!(frame.format(), FrameFormat::Rgba8);
        assert_eq!(frame.width(), 4);
    }

    #[test]
    fn test_malformed_frame_dropped_pipeline_continues() {
        let channel = Arc::new(FrameChannel::new());
        let sink = CaptureSink::new(channel.clone());

        let short = vec![0u8; 3];
        assert!(matches!(
            sink.ingest(yuv_raw(&short, 4, 4)),
            Err(CaptureError::MalformedFrame(_))
        ));
        assert_eq!(sink.frames_dropped(), 1);
        assert!(sink.is_running(), "one bad frame must not stop the sink");

        let good = vec![128u8; 4 * 4 + 2 * 4];
        sink.ingest(yuv_raw(&good, 4, 4)).unwrap();
        assert!(channel.try_take().is_some());
    }

    #[test]
    fn test_stop_quiesces_and_drains() {
        let channel = Arc::new(FrameChannel::new());
        let sink = CaptureSink::new(channel.clone());

        let data = vec![128u8; 4 * 4 + 2 * 4];
        sink.ingest(yuv_raw(&data, 4, 4)).unwrap();
        sink.stop();

        assert!(channel.try_take().is_none(), "pending frame drained");
        sink.ingest(yuv_raw(&data, 4, 4)).unwrap();
        assert!(channel.try_take().is_none(), "ingest after stop is a no-op");
    }

    #[test]
    fn test_disconnect_fails_further_ingest() {
        let channel = Arc::new(FrameChannel::new());
        let sink = CaptureSink::new(channel.clone());
        sink.mark_disconnected();

        assert!(sink.is_disconnected());
        assert!(!sink.is_running());

        let data = vec![128u8; 4 * 4 + 2 * 4];
        assert!(matches!(
            sink.ingest(yuv_raw(&data, 4, 4)),
            Err(CaptureError::Disconnected)
        ));
        assert!(channel.try_take().is_none(), "nothing published after loss");
    }

    #[test]
    fn test_ingest_preserves_capture_timestamp() {
        let channel = Arc::new(FrameChannel::new());
        let sink = CaptureSink::new(channel.clone());

        let timestamp = Instant::now() - std::time::Duration::from_millis(250);
        let data = vec![128u8; 4 * 4 + 2 * 4];
        let raw = RawFrame {
            data: &data,
            width: 4,
            height: 4,
            stride: 4,
            format: FrameFormat::Yuv420Planar,
            timestamp,
        };
        sink.ingest(raw).unwrap();

        let frame = channel.try_take().expect("frame published");
        assert_eq!(frame.captured_at(), timestamp);
    }
}
