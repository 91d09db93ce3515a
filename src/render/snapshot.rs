// SPDX-License-Identifier: GPL-3.0-only

//! Snapshot request marshalling
//!
//! GPU readback must run on the render context. Callers on any thread park
//! a request in a shared queue; the render loop services the queue at the
//! end of each tick and answers through a rendezvous channel. The caller
//! waits with a bounded timeout so a wedged render context yields an error
//! instead of a hang.

use crate::constants::SNAPSHOT_TIMEOUT;
use crate::errors::SnapshotError;
use crate::frame::FrameBuffer;
use std::sync::mpsc::{SyncSender, sync_channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type SnapshotReply = Result<FrameBuffer, SnapshotError>;

/// Queue of callers waiting for a readback, shared between the render
/// loop and any number of snapshot handles
#[derive(Debug, Default)]
pub(crate) struct SnapshotQueue {
    waiters: Mutex<Vec<SyncSender<SnapshotReply>>>,
}

impl SnapshotQueue {
    pub(crate) fn push(&self, sender: SyncSender<SnapshotReply>) {
        if let Ok(mut waiters) = self.waiters.lock() {
            waiters.push(sender);
        }
    }

    /// Drain all pending requests. Called from the render context.
    pub(crate) fn drain(&self) -> Vec<SyncSender<SnapshotReply>> {
        match self.waiters.lock() {
            Ok(mut waiters) => std::mem::take(&mut *waiters),
            Err(_) => Vec::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.lock().map(|w| w.is_empty()).unwrap_or(true)
    }
}

/// Cloneable, thread-safe entry point for snapshot requests
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    queue: Arc<SnapshotQueue>,
}

impl SnapshotHandle {
    pub(crate) fn new(queue: Arc<SnapshotQueue>) -> Self {
        Self { queue }
    }

    /// Capture the currently displayed (post-effect) image.
    ///
    /// Blocks until the render context completes its tick and performs the
    /// readback, up to the default bounded wait.
    pub fn capture(&self) -> Result<FrameBuffer, SnapshotError> {
        self.capture_timeout(SNAPSHOT_TIMEOUT)
    }

    /// [`capture`](SnapshotHandle::capture) with an explicit bound
    pub fn capture_timeout(&self, timeout: Duration) -> Result<FrameBuffer, SnapshotError> {
        let (sender, receiver) = sync_channel(1);
        self.queue.push(sender);
        receiver
            .recv_timeout(timeout)
            .map_err(|_| SnapshotError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_times_out_without_render_context() {
        let handle = SnapshotHandle::new(Arc::new(SnapshotQueue::default()));
        let err = handle
            .capture_timeout(Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Timeout));
    }

    #[test]
    fn test_queue_drains_once() {
        let queue = Arc::new(SnapshotQueue::default());
        let (sender, _receiver) = sync_channel(1);
        queue.push(sender);
        assert!(!queue.is_empty());
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_serviced_request_receives_reply() {
        let queue = Arc::new(SnapshotQueue::default());
        let handle = SnapshotHandle::new(queue.clone());

        let servicer = std::thread::spawn({
            let queue = queue.clone();
            move || {
                // Poll like a render tick would
                loop {
                    let waiters = queue.drain();
                    if !waiters.is_empty() {
                        for waiter in waiters {
                            let _ = waiter.send(Err(SnapshotError::NoFrameAvailable));
                        }
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        });

        let err = handle
            .capture_timeout(Duration::from_millis(500))
            .unwrap_err();
        assert!(matches!(err, SnapshotError::NoFrameAvailable));
        servicer.join().unwrap();
    }
}
