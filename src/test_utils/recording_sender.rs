//! A sender that records batches in memory for test assertions.
//!
//! Clones share state, so a test keeps one clone for inspection and hands the
//! other to the transport.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::TransportError;
use crate::transport::BatchSender;

#[derive(Default)]
struct Recorded {
    script: Mutex<VecDeque<Result<(), u16>>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    batches: Mutex<Vec<Value>>,
    attempts: AtomicUsize,
    closes: AtomicUsize,
}

/// Sender that stores every payload and answers from a script.
///
/// Scripted outcomes are consumed first; once the script is empty the sender
/// succeeds unless [`set_failing`](Self::set_failing) switched it to failing.
#[derive(Clone, Default)]
pub struct RecordingSender {
    inner: Arc<Recorded>,
}

impl RecordingSender {
    /// A sender that accepts every batch.
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// A sender that answers every batch with HTTP 503.
    pub fn failing() -> Self {
        let sender = Self::default();
        sender.set_failing(true);
        sender
    }

    /// Answer the next sends with `outcomes` (`Err(status)` for failures).
    pub fn with_script(outcomes: impl IntoIterator<Item = Result<(), u16>>) -> Self {
        let sender = Self::default();
        sender.inner.script.lock().extend(outcomes);
        sender
    }

    /// Switch the fallback outcome once the script is exhausted.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Sleep this long inside every send, simulating a slow endpoint.
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock() = Some(delay);
    }

    /// Number of send attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Number of times the sender was closed.
    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    /// Every payload received, parsed as JSON, including failed attempts.
    pub fn batches(&self) -> Vec<Value> {
        self.inner.batches.lock().clone()
    }

    /// Request ids per received payload, in send order.
    pub fn request_ids(&self) -> Vec<Vec<String>> {
        self.batches()
            .iter()
            .map(|batch| {
                batch["entries"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|entry| entry["requestId"].as_str().map(str::to_owned))
                    .collect()
            })
            .collect()
    }

    fn next_outcome(&self) -> Result<(), u16> {
        self.inner.script.lock().pop_front().unwrap_or_else(|| {
            if self.inner.failing.load(Ordering::SeqCst) {
                Err(503)
            } else {
                Ok(())
            }
        })
    }
}

impl BatchSender for RecordingSender {
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        let parsed: Value = serde_json::from_str(payload)?;
        self.inner.batches.lock().push(parsed);
        let delay = *self.inner.delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.next_outcome().map_err(TransportError::Status)
    }

    fn close(&self) {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
    }
}
