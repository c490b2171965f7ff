//! Buffering, flushing, and circuit breaking for log entries.
//!
//! All buffer and counter bookkeeping happens under one `state` mutex that is
//! never held across network I/O. A second `send_lock` serialises whole flush
//! attempts so failure counts and re-queue order stay exact while callers of
//! [`BatchTransport::add`] below the batch threshold never wait on the network.

use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use delegate::delegate;
use log::{debug, warn};
use parking_lot::Mutex;

use crate::{
    batch::LogBatch, entry::RequestLogEntry, error::ConfigError, error::TransportError,
    rate_limited_warner::RateLimitedWarner,
};

use super::{
    config::TransportConfig,
    sender::{BatchSender, HttpSender},
    worker::FlushTimer,
};

/// What a single [`flush`](BatchTransport::flush) call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered.
    Empty,
    /// The circuit breaker is open; the buffer was left untouched.
    CircuitOpen,
    /// This many entries were delivered.
    Sent(usize),
    /// Delivery failed; this many entries went back to the head of the buffer.
    Requeued(usize),
    /// The transport has released its network client.
    Closed,
}

#[derive(Debug, Default)]
struct TransportState {
    buffer: VecDeque<RequestLogEntry>,
    consecutive_failures: u32,
    circuit_breaker_until: Option<Instant>,
    closed: bool,
    released: bool,
}

impl TransportState {
    fn circuit_open(&self, now: Instant) -> bool {
        self.circuit_breaker_until.is_some_and(|until| now < until)
    }
}

/// State shared between the transport handle and its flush timer.
pub(super) struct TransportCore {
    config: TransportConfig,
    state: Mutex<TransportState>,
    send_lock: Mutex<()>,
    sender: Box<dyn BatchSender>,
    failures: RateLimitedWarner,
    late_entries: RateLimitedWarner,
}

impl TransportCore {
    fn add(&self, entry: RequestLogEntry) {
        let should_flush = {
            let mut state = self.state.lock();
            if state.closed {
                drop(state);
                self.late_entries.record_and_warn(|count| {
                    warn!("GT8004 transport is closed; dropped {count} entries");
                });
                return;
            }
            state.buffer.push_back(entry);
            state.buffer.len() >= self.config.batch_size
        };
        if should_flush {
            self.flush();
        }
    }

    pub(super) fn flush(&self) -> FlushOutcome {
        let _sending = self.send_lock.lock();
        let batch: Vec<RequestLogEntry> = {
            let mut state = self.state.lock();
            if state.released {
                return FlushOutcome::Closed;
            }
            if state.buffer.is_empty() {
                return FlushOutcome::Empty;
            }
            if state.circuit_open(Instant::now()) {
                return FlushOutcome::CircuitOpen;
            }
            state.buffer.drain(..).collect()
        };

        let count = batch.len();
        match self.send(&batch) {
            Ok(()) => {
                self.state.lock().consecutive_failures = 0;
                debug!("GT8004 sent batch of {count} entries");
                FlushOutcome::Sent(count)
            }
            Err(err) => {
                self.requeue(batch, &err);
                FlushOutcome::Requeued(count)
            }
        }
    }

    fn send(&self, batch: &[RequestLogEntry]) -> Result<(), TransportError> {
        let payload = LogBatch::new(&self.config.agent_id, batch).to_json()?;
        self.sender.send(&payload)
    }

    fn requeue(&self, batch: Vec<RequestLogEntry>, err: &TransportError) {
        let count = batch.len();
        let (failures, opened_for) = {
            let mut state = self.state.lock();
            let mut requeued = VecDeque::from(batch);
            requeued.append(&mut state.buffer);
            state.buffer = requeued;
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            let opened_for = (state.consecutive_failures >= self.config.failure_threshold)
                .then(|| {
                    let cooldown = self.config.circuit_breaker_cooldown;
                    state.circuit_breaker_until = Some(Instant::now() + cooldown);
                    cooldown
                });
            (state.consecutive_failures, opened_for)
        };

        self.failures.record_and_warn(|attempts| {
            warn!("GT8004 failed to send {attempts} batches; last batch of {count} entries requeued: {err}");
        });
        if let Some(cooldown) = opened_for {
            warn!(
                "GT8004 circuit breaker open for {cooldown:?} after {failures} consecutive failures"
            );
        }
    }

    pub(super) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Mark the core closed. Returns `false` if it already was.
    fn begin_close(&self) -> bool {
        !std::mem::replace(&mut self.state.lock().closed, true)
    }

    fn release_sender(&self) {
        let _sending = self.send_lock.lock();
        let stranded = {
            let mut state = self.state.lock();
            state.released = true;
            state.buffer.len()
        };
        if stranded > 0 {
            warn!("GT8004 transport closed with {stranded} unsent entries");
        }
        self.sender.close();
        self.failures.flush(|attempts| {
            warn!("GT8004 failed to send {attempts} batches before close");
        });
        self.late_entries.flush(|count| {
            warn!("GT8004 transport is closed; dropped {count} entries");
        });
    }
}

/// Buffers entries and ships them to the ingest endpoint in batches.
///
/// Sends happen when the buffer reaches `batch_size`, when the background
/// timer fires (see [`start_auto_flush`](Self::start_auto_flush)), on explicit
/// [`flush`](Self::flush), and once more on [`close`](Self::close). Failed
/// batches return to the head of the buffer; after `failure_threshold`
/// consecutive failures the circuit breaker suppresses sends for
/// `circuit_breaker_cooldown`. Nothing on this type returns an error after
/// construction.
pub struct BatchTransport {
    core: Arc<TransportCore>,
    timer: Mutex<Option<FlushTimer>>,
}

impl BatchTransport {
    /// Construct a transport posting to `config.ingest_url` over HTTP.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let sender = HttpSender::new(&config)?;
        Self::with_sender(config, sender)
    }

    /// Construct a transport delivering batches through `sender`.
    pub fn with_sender<S>(config: TransportConfig, sender: S) -> Result<Self, ConfigError>
    where
        S: BatchSender + 'static,
    {
        config.validate()?;
        let core = TransportCore {
            failures: RateLimitedWarner::new(config.warn_interval),
            late_entries: RateLimitedWarner::new(config.warn_interval),
            state: Mutex::new(TransportState::default()),
            send_lock: Mutex::new(()),
            sender: Box::new(sender),
            config,
        };
        Ok(Self {
            core: Arc::new(core),
            timer: Mutex::new(None),
        })
    }

    delegate! {
        to self.core {
            /// Append `entry` to the buffer, flushing synchronously once the
            /// buffer holds `batch_size` entries. Entries added after
            /// [`close`](Self::close) are dropped with a warning.
            pub fn add(&self, entry: RequestLogEntry);
            /// Attempt to send everything buffered in one request.
            pub fn flush(&self) -> FlushOutcome;
            /// Whether [`close`](Self::close) has begun.
            pub fn is_closed(&self) -> bool;
        }
    }

    /// Start the background flush timer. Idempotent.
    ///
    /// Returns `false` if the transport is closed or the timer thread could
    /// not be spawned.
    pub fn start_auto_flush(&self) -> bool {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            return true;
        }
        if self.core.is_closed() {
            return false;
        }
        match FlushTimer::spawn(Arc::clone(&self.core), self.core.config.flush_interval) {
            Ok(spawned) => {
                *timer = Some(spawned);
                true
            }
            Err(err) => {
                warn!("GT8004 failed to start flush timer: {err}");
                false
            }
        }
    }

    /// Stop the background flush timer, waiting for an in-flight flush.
    pub fn stop_auto_flush(&self) {
        let timer = self.timer.lock().take();
        if let Some(timer) = timer {
            timer.stop();
        }
    }

    pub fn is_auto_flush_running(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Stop the timer, make one final flush attempt, and release the
    /// network client. Only the first call does any work.
    pub fn close(&self) {
        if !self.core.begin_close() {
            return;
        }
        self.stop_auto_flush();
        match self.core.flush() {
            FlushOutcome::Sent(count) => debug!("GT8004 final flush sent {count} entries"),
            FlushOutcome::Requeued(_) | FlushOutcome::CircuitOpen => {
                debug!("GT8004 final flush did not deliver buffered entries");
            }
            FlushOutcome::Empty | FlushOutcome::Closed => {}
        }
        self.core.release_sender();
    }

    pub fn config(&self) -> &TransportConfig {
        &self.core.config
    }

    pub fn batch_size(&self) -> usize {
        self.core.config.batch_size
    }

    pub fn flush_interval(&self) -> Duration {
        self.core.config.flush_interval
    }

    /// Number of entries waiting to be sent.
    pub fn buffered_len(&self) -> usize {
        self.core.state.lock().buffer.len()
    }

    /// Request ids of buffered entries, oldest first.
    pub fn buffered_request_ids(&self) -> Vec<String> {
        self.core
            .state
            .lock()
            .buffer
            .iter()
            .map(|entry| entry.request_id().to_owned())
            .collect()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.core.state.lock().consecutive_failures
    }

    /// Instant until which sends are suppressed, if the breaker was ever opened.
    pub fn circuit_breaker_until(&self) -> Option<Instant> {
        self.core.state.lock().circuit_breaker_until
    }

    pub fn is_circuit_open(&self) -> bool {
        self.core.state.lock().circuit_open(Instant::now())
    }
}

impl Drop for BatchTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for BatchTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.core.state.lock();
        f.debug_struct("BatchTransport")
            .field("ingest_url", &self.core.config.ingest_url)
            .field("batch_size", &self.core.config.batch_size)
            .field("buffered", &state.buffer.len())
            .field("consecutive_failures", &state.consecutive_failures)
            .field("closed", &state.closed)
            .finish()
    }
}
