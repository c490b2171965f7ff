//! Client façade used by framework adapters.
//!
//! [`LogEntryQueueClient`] wraps one [`BatchTransport`] together with the
//! protocol of the service it instruments, so adapters can hand over a
//! [`RequestCapture`] without restating how tool names are extracted.

use delegate::delegate;
use log::warn;

use crate::capture::RequestCapture;
use crate::entry::{Protocol, RequestLogEntry};
use crate::error::ConfigError;
use crate::rate_limited_warner::RateLimitedWarner;
use crate::transport::{BatchTransport, FlushOutcome, TransportBuilder};

/// Queues request log entries for background delivery.
///
/// Logging never fails from the caller's point of view: [`log`](Self::log)
/// returns after buffer insertion and at most one threshold-triggered send.
#[derive(Debug)]
pub struct LogEntryQueueClient {
    transport: BatchTransport,
    protocol: Option<Protocol>,
    rejected: RateLimitedWarner,
}

impl LogEntryQueueClient {
    /// Wrap `transport` for plain HTTP traffic.
    pub fn new(transport: BatchTransport) -> Self {
        Self::with_protocol(transport, None)
    }

    /// Wrap `transport` for traffic of the given protocol.
    pub fn with_protocol(transport: BatchTransport, protocol: Option<Protocol>) -> Self {
        let rejected = RateLimitedWarner::new(transport.config().warn_interval);
        Self {
            transport,
            protocol,
            rejected,
        }
    }

    /// Connect to the default ingest endpoint with default batching.
    pub fn connect(
        agent_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let transport = TransportBuilder::new()
            .with_agent_id(agent_id)
            .with_api_key(api_key)
            .build()?;
        Ok(Self::new(transport))
    }

    /// Queue an already built entry.
    pub fn log(&self, entry: RequestLogEntry) {
        self.transport.add(entry);
    }

    /// Convert `capture` with this client's protocol and queue it.
    ///
    /// A capture that cannot form a valid entry is dropped with a
    /// rate-limited warning.
    pub fn record(&self, capture: RequestCapture) {
        match capture.into_entry(self.protocol) {
            Ok(entry) => self.transport.add(entry),
            Err(err) => self.rejected.record_and_warn(|count| {
                warn!("GT8004 dropped {count} requests that could not be logged: {err}");
            }),
        }
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    pub fn transport(&self) -> &BatchTransport {
        &self.transport
    }

    delegate! {
        to self.transport {
            /// Send everything buffered now.
            pub fn flush(&self) -> FlushOutcome;
            /// Start periodic background flushing.
            pub fn start_auto_flush(&self) -> bool;
            pub fn stop_auto_flush(&self);
            /// Stop the timer, flush once more, and release the network client.
            pub fn close(&self);
            pub fn buffered_len(&self) -> usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_utils::{RecordingSender, entry};
    use rstest::{fixture, rstest};

    #[fixture]
    fn sender() -> RecordingSender {
        RecordingSender::succeeding()
    }

    fn client(sender: &RecordingSender, protocol: Option<Protocol>) -> LogEntryQueueClient {
        let transport = TransportBuilder::new()
            .with_ingest_url("http://x/ingest")
            .with_agent_id("a")
            .with_api_key("k")
            .with_batch_size(2)
            .build_with_sender(sender.clone())
            .expect("transport");
        LogEntryQueueClient::with_protocol(transport, protocol)
    }

    #[rstest]
    fn log_buffers_until_threshold(sender: RecordingSender) {
        let client = client(&sender, None);
        client.log(entry("r1"));
        assert_eq!(client.buffered_len(), 1);
        assert_eq!(sender.attempts(), 0);
        client.log(entry("r2"));
        assert_eq!(sender.request_ids(), vec![vec!["r1", "r2"]]);
    }

    #[rstest]
    fn record_applies_client_protocol(sender: RecordingSender) {
        let client = client(&sender, Some(Protocol::Mcp));
        let capture = RequestCapture::new("POST", "/mcp", 200, Duration::from_millis(3))
            .with_request_body(br#"{"method":"tools/call","params":{"name":"search"}}"#)
            .with_request_id("r1");
        client.record(capture);
        assert_eq!(client.flush(), FlushOutcome::Sent(1));

        let batch = &sender.batches()[0];
        assert_eq!(batch["entries"][0]["protocol"], "mcp");
        assert_eq!(batch["entries"][0]["toolName"], "search");
    }

    #[rstest]
    fn record_drops_invalid_capture(sender: RecordingSender) {
        let client = client(&sender, None);
        client.record(RequestCapture::new("", "/x", 200, Duration::ZERO));
        assert_eq!(client.buffered_len(), 0);
    }

    #[rstest]
    fn close_is_forwarded_once(sender: RecordingSender) {
        let client = client(&sender, Some(Protocol::A2a));
        assert_eq!(client.protocol(), Some(Protocol::A2a));
        client.log(entry("r1"));
        client.close();
        client.close();
        assert_eq!(sender.attempts(), 1);
        assert_eq!(sender.closes(), 1);
        assert!(client.transport().is_closed());
    }

    #[rstest]
    fn connect_uses_default_endpoint() {
        let client = LogEntryQueueClient::connect("agent", "key").expect("client");
        assert_eq!(
            client.transport().config().ingest_url,
            crate::transport::DEFAULT_INGEST_URL
        );
        assert_eq!(client.protocol(), None);
    }

    #[rstest]
    fn connect_rejects_missing_credentials() {
        assert!(LogEntryQueueClient::connect("agent", "").is_err());
    }
}
