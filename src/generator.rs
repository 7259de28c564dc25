//! Frame generator: turns frame requests into frame batches.
//!
//! The generator is the only owner of the connection's frame index. Each
//! `Count(n)` request produces one batch covering `[index, index + n)`,
//! which is pushed onto the batch queue before the index advances. The push
//! waits for queue space, so a writer that falls behind stalls the
//! generator instead of letting batches pile up.
//!
//! ```text
//!            Count(n)                 batch pushed
//!   Idle ───────────────► Computing ───────────────► Idle
//!    │
//!    │ Stop / queue closed
//!    ▼
//!  Terminated
//! ```

use std::ops::Range;

use tokio::sync::mpsc;

use crate::frame::{FrameBatch, Orbit};
use crate::request::FrameRequest;

/// Why the generator terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorExit {
    /// Received [`FrameRequest::Stop`].
    Stopped,
    /// Every request sender was dropped without a `Stop`.
    RequestsClosed,
    /// The batch consumer went away.
    OutputClosed,
}

/// Produces consecutive frame batches for one connection.
#[derive(Debug)]
pub struct FrameGenerator {
    orbit: Orbit,
    frame_count: u64,
}

impl FrameGenerator {
    /// Generator starting at frame 0.
    pub fn new(orbit: Orbit) -> Self {
        Self {
            orbit,
            frame_count: 0,
        }
    }

    /// Index of the next frame to be generated.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn next_range(&self, count: u64) -> Range<u64> {
        self.frame_count..self.frame_count.saturating_add(count)
    }

    /// Compute the next `count` frames without advancing.
    fn compute(&self, count: u64) -> FrameBatch {
        let range = self.next_range(count);
        FrameBatch::new(range.start, self.orbit.frames(range))
    }

    /// Serve requests until `Stop`, then close the batch queue.
    ///
    /// The batch queue closes when this returns and `batches` is dropped.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<FrameRequest>,
        batches: mpsc::Sender<FrameBatch>,
    ) -> GeneratorExit {
        let exit = loop {
            let count = match requests.recv().await {
                Some(FrameRequest::Count(count)) => count,
                Some(FrameRequest::Stop) => break GeneratorExit::Stopped,
                None => break GeneratorExit::RequestsClosed,
            };

            let batch = self.compute(count);
            log::trace!("[Generator] frames {:?}", batch.indices());

            if batches.send(batch).await.is_err() {
                break GeneratorExit::OutputClosed;
            }
            self.frame_count = self.frame_count.saturating_add(count);
        };

        log::debug!(
            "[Generator] terminated after {} frames: {:?}",
            self.frame_count,
            exit
        );
        exit
    }
}
