use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::traits::TransmitSink;

#[derive(Debug, Default)]
struct Recorded {
    frames: Vec<Bytes>,
    fail_next: usize,
}

/// Sink that records every frame in memory.
///
/// Clones share the same recording, so a test can keep one handle while the
/// scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all frames transmitted so far, in order.
    pub fn frames(&self) -> Vec<Bytes> {
        self.lock().frames.clone()
    }

    /// Number of frames transmitted so far.
    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    /// True when nothing has been transmitted.
    pub fn is_empty(&self) -> bool {
        self.lock().frames.is_empty()
    }

    /// Remove and return all recorded frames.
    pub fn take(&self) -> Vec<Bytes> {
        std::mem::take(&mut self.lock().frames)
    }

    /// Make the next `count` transmissions fail with [`TransportError::Closed`].
    pub fn fail_next(&self, count: usize) {
        self.lock().fail_next = count;
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        // A panicking test thread must not hide what was recorded before it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TransmitSink for MemorySink {
    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        let mut recorded = self.lock();
        if recorded.fail_next > 0 {
            recorded.fail_next -= 1;
            return Err(TransportError::Closed);
        }
        recorded.frames.push(Bytes::copy_from_slice(frame));
        Ok(())
    }
}
