//! Request-logging SDK for the GT8004 ingest service.
//!
//! Framework adapters describe each handled request as a
//! [`RequestCapture`] or a [`RequestLogEntry`] and hand it to a
//! [`LogEntryQueueClient`]. Entries are buffered in memory and shipped in
//! JSON batches by a [`BatchTransport`], either when the buffer fills, on a
//! background timer, or on close. Delivery failures are logged through the
//! `log` facade and never reach the caller.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use gt8004::{LogEntryQueueClient, Protocol, RequestCapture, TransportBuilder};
//!
//! # fn main() -> Result<(), gt8004::ConfigError> {
//! let transport = TransportBuilder::new()
//!     .with_agent_id("agent-123")
//!     .with_api_key("secret")
//!     .with_batch_size(20)
//!     .build()?;
//! let client = LogEntryQueueClient::with_protocol(transport, Some(Protocol::Mcp));
//! client.start_auto_flush();
//!
//! client.record(
//!     RequestCapture::new("POST", "/mcp", 200, Duration::from_millis(42))
//!         .with_request_body(br#"{"method":"tools/call","params":{"name":"search"}}"#)
//!         .with_header("User-Agent", "curl/8.0"),
//! );
//!
//! client.close();
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod capture;
pub mod client;
pub mod entry;
pub mod error;
pub mod extract;
pub mod rate_limited_warner;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use batch::{LogBatch, SDK_VERSION};
pub use capture::{CapturedBody, RequestCapture, capture_body};
pub use client::LogEntryQueueClient;
pub use entry::{Protocol, RequestLogEntry, RequestLogEntryBuilder};
pub use error::{ConfigError, EntryError, TransportError};
pub use extract::{BODY_LIMIT, extract_a2a, extract_http, extract_mcp, extract_tool_name};
pub use transport::{
    BatchSender, BatchTransport, FlushOutcome, HttpSender, TransportBuilder, TransportConfig,
};
