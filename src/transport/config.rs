//! Configuration consumed by [`BatchTransport`](super::BatchTransport).
//!
//! [`TransportBuilder`](super::TransportBuilder) fills these values in before
//! the transport is constructed. The transport validates them once at
//! construction and never re-checks them afterwards.

use std::time::Duration;

use crate::error::ConfigError;
use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

/// Default ingest endpoint.
pub const DEFAULT_INGEST_URL: &str = "https://api.gt8004.xyz/v1/ingest";
/// Default number of buffered entries that triggers an immediate flush.
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Default period of the background flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
/// Default connection timeout for the ingest endpoint.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for a whole batch request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Consecutive failed sends that open the circuit breaker.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// How long an open circuit breaker suppresses sends.
pub const DEFAULT_CIRCUIT_BREAKER_COOLDOWN: Duration = Duration::from_secs(60);

macro_rules! ensure {
    ($cond:expr, $($msg:tt)+) => {{
        if !$cond {
            return Err(ConfigError::InvalidConfig(format!($($msg)+)));
        }
    }};
}

/// Settings for one transport instance.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Endpoint receiving `POST` batch requests.
    pub ingest_url: String,
    /// Credential sent as `Authorization: Bearer <api_key>`.
    pub api_key: String,
    /// Agent identifier attached to every batch.
    pub agent_id: String,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub failure_threshold: u32,
    pub circuit_breaker_cooldown: Duration,
    /// Minimum gap between repeated failure warnings.
    pub warn_interval: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ingest_url: DEFAULT_INGEST_URL.into(),
            api_key: String::new(),
            agent_id: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            circuit_breaker_cooldown: DEFAULT_CIRCUIT_BREAKER_COOLDOWN,
            warn_interval: DEFAULT_WARN_INTERVAL,
            user_agent: concat!("gt8004-rust/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    /// Configuration for `agent_id` authenticated by `api_key`, with defaults
    /// for everything else.
    pub fn new(agent_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Check every field the transport relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.ingest_url.trim().is_empty(), "ingest_url must not be empty");
        ensure!(!self.api_key.is_empty(), "api_key must not be empty");
        ensure!(!self.agent_id.is_empty(), "agent_id must not be empty");
        ensure!(self.batch_size > 0, "batch_size must be greater than zero");
        ensure!(
            !self.flush_interval.is_zero(),
            "flush_interval must be greater than zero"
        );
        ensure!(
            !self.connect_timeout.is_zero(),
            "connect_timeout must be greater than zero"
        );
        ensure!(
            !self.request_timeout.is_zero(),
            "request_timeout must be greater than zero"
        );
        ensure!(
            self.failure_threshold > 0,
            "failure_threshold must be greater than zero"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid() -> TransportConfig {
        TransportConfig::new("agent", "key")
    }

    #[rstest]
    fn defaults_match_documented_values() {
        let config = valid();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.flush_interval, Duration::from_secs_f64(5.0));
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.circuit_breaker_cooldown, Duration::from_secs(60));
        assert_eq!(config.ingest_url, DEFAULT_INGEST_URL);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::zero_batch(TransportConfig { batch_size: 0, ..valid() }, "batch_size")]
    #[case::zero_interval(TransportConfig { flush_interval: Duration::ZERO, ..valid() }, "flush_interval")]
    #[case::empty_url(TransportConfig { ingest_url: "  ".into(), ..valid() }, "ingest_url")]
    #[case::empty_key(TransportConfig { api_key: String::new(), ..valid() }, "api_key")]
    #[case::empty_agent(TransportConfig { agent_id: String::new(), ..valid() }, "agent_id")]
    #[case::zero_threshold(TransportConfig { failure_threshold: 0, ..valid() }, "failure_threshold")]
    #[case::zero_timeout(TransportConfig { request_timeout: Duration::ZERO, ..valid() }, "request_timeout")]
    fn rejects_invalid_fields(#[case] config: TransportConfig, #[case] field: &str) {
        match config.validate() {
            Err(ConfigError::InvalidConfig(msg)) => assert!(msg.contains(field), "{msg}"),
            other => panic!("expected InvalidConfig for {field}, got {other:?}"),
        }
    }
}
