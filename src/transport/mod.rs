//! Batching transport for request log entries.
//!
//! [`BatchTransport`] owns an in-memory FIFO buffer of
//! [`RequestLogEntry`](crate::entry::RequestLogEntry) values and ships them to
//! the ingest endpoint as JSON batches. Delivery never raises into the caller:
//! failures are logged and the affected entries stay buffered for a later
//! attempt.
//!
//! # Flush triggers
//!
//! - The buffer reaching `batch_size` during [`BatchTransport::add`] (the
//!   caller waits for that one send attempt).
//! - The background timer started by [`BatchTransport::start_auto_flush`].
//! - Explicit [`BatchTransport::flush`] calls and the final attempt made by
//!   [`BatchTransport::close`].
//!
//! # Failure handling
//!
//! - **2xx**: delivered; the consecutive failure counter resets.
//! - **Anything else** (non-2xx status, network error, timeout): the batch is
//!   put back at the head of the buffer and the counter increments.
//! - **`failure_threshold` consecutive failures**: the circuit breaker opens
//!   for `circuit_breaker_cooldown`. While open, flushes skip the network and
//!   leave the buffer untouched.
//!
//! There is no retry loop inside a single flush; retries are simply later
//! flushes.

mod batch_transport;
mod builder;
mod config;
mod sender;
mod worker;


pub use batch_transport::{BatchTransport, FlushOutcome};
pub use builder::TransportBuilder;
pub use config::{
    DEFAULT_BATCH_SIZE, DEFAULT_CIRCUIT_BREAKER_COOLDOWN, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_FLUSH_INTERVAL, DEFAULT_INGEST_URL,
    DEFAULT_REQUEST_TIMEOUT, TransportConfig,
};
pub use sender::{BatchSender, HttpSender};
