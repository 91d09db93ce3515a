// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot, latest-wins frame handoff
//!
//! [`FrameChannel`] decouples the capture cadence from the render cadence:
//! the capture context publishes at its own rate, the render context takes
//! whatever is newest on each tick. A new publish unconditionally replaces
//! an unconsumed frame; nothing is ever queued, so neither side can stall
//! the other.

use crate::frame::FrameBuffer;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Latest-wins single-producer/single-consumer frame slot
#[derive(Debug, Default)]
pub struct FrameChannel {
    slot: Mutex<Option<FrameBuffer>>,
    sequence: AtomicU64,
}

impl FrameChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a frame from the capture context.
    ///
    /// Replaces (and drops) any unconsumed pending frame and bumps the
    /// sequence number. The slot mutex is held only for the swap, so the
    /// capture context never waits on GPU work.
    pub fn publish(&self, frame: FrameBuffer) {
        let superseded = match self.slot.lock() {
            Ok(mut slot) => slot.replace(frame),
            Err(poisoned) => poisoned.into_inner().replace(frame),
        };
        let seq = self.sequence.fetch_add(1, Ordering::Release) + 1;
        if superseded.is_some() {
            tracing::trace!(seq, "superseded unconsumed frame");
        }
    }

    /// Take the most recent published frame not yet consumed, if any.
    /// Called from the render context; never blocks on the producer.
    pub fn try_take(&self) -> Option<FrameBuffer> {
        match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Number of frames published so far (monotonic)
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Discard any pending frame. Used when the pipeline stops, after the
    /// capture side has been quiesced.
    pub fn drain(&self) {
        self.try_take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(value: u8) -> FrameBuffer {
        FrameBuffer::rgba8(2, 2, 8, vec![value; 32]).unwrap()
    }

    #[test]
    fn test_empty_channel_returns_none() {
        let channel = FrameChannel::new();
        assert!(channel.try_take().is_none());
        assert_eq!(channel.sequence(), 0);
    }

    #[test]
    fn test_latest_wins() {
        let channel = FrameChannel::new();
        for value in 1..=5u8 {
            channel.publish(solid_frame(value));
        }
        let frame = channel.try_take().expect("one frame pending");
        assert_eq!(frame.data()[0], 5);
        assert!(channel.try_take().is_none(), "slot consumed exactly once");
        assert_eq!(channel.sequence(), 5);
    }

    #[test]
    fn test_publish_after_take() {
        let channel = FrameChannel::new();
        channel.publish(solid_frame(1));
        assert!(channel.try_take().is_some());
        channel.publish(solid_frame(2));
        assert_eq!(channel.try_take().unwrap().data()[0], 2);
    }

    #[test]
    fn test_drain_discards_pending() {
        let channel = FrameChannel::new();
        channel.publish(solid_frame(9));
        channel.drain();
        assert!(channel.try_take().is_none());
    }
}
