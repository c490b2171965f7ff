//! Builder for [`BatchTransport`].
//!
//! Collects the ingest endpoint, credentials, batching thresholds, timeouts,
//! and circuit breaker parameters, validates them, and constructs the
//! transport with either the HTTP sender or a caller supplied one.

use std::time::Duration;

use crate::error::ConfigError;

use super::{BatchSender, BatchTransport, TransportConfig};

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`BatchTransport`] instances.
#[derive(Clone, Debug, Default)]
pub struct TransportBuilder {
    ingest_url: Option<String>,
    api_key: Option<String>,
    agent_id: Option<String>,
    batch_size: Option<usize>,
    flush_interval_secs: Option<f64>,
    connect_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    failure_threshold: Option<u32>,
    circuit_breaker_cooldown: Option<Duration>,
    warn_interval: Option<Duration>,
}

impl TransportBuilder {
    /// Create a builder with nothing configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the ingest endpoint URL.
    pub fn with_ingest_url(mut self, url: impl Into<String>) -> Self {
        self.ingest_url = Some(url.into());
        self
    }

    /// Set the bearer credential (required).
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the agent identifier (required).
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    option_setter!(
        #[doc = "Set the buffered entry count that triggers an immediate flush."]
        with_batch_size,
        batch_size,
        usize
    );
    option_setter!(
        #[doc = "Set the background flush period in seconds."]
        with_flush_interval_secs,
        flush_interval_secs,
        f64
    );
    option_setter!(
        #[doc = "Set the connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the whole-request timeout in milliseconds."]
        with_request_timeout_ms,
        request_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set how many consecutive failures open the circuit breaker."]
        with_failure_threshold,
        failure_threshold,
        u32
    );
    option_setter!(
        #[doc = "Set how long an open circuit breaker suppresses sends."]
        with_circuit_breaker_cooldown,
        circuit_breaker_cooldown,
        Duration
    );
    option_setter!(
        #[doc = "Set the minimum gap between repeated failure warnings."]
        with_warn_interval,
        warn_interval,
        Duration
    );

    /// Set the background flush period.
    pub fn with_flush_interval(self, interval: Duration) -> Self {
        self.with_flush_interval_secs(interval.as_secs_f64())
    }

    fn flush_interval(&self) -> Result<Option<Duration>, ConfigError> {
        let Some(secs) = self.flush_interval_secs else {
            return Ok(None);
        };
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::InvalidConfig(format!(
                "flush_interval must be a positive number of seconds, got {secs}"
            )));
        }
        Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|err| ConfigError::InvalidConfig(format!("flush_interval: {err}")))
    }

    /// Produce a validated configuration without building a transport.
    pub fn build_config(&self) -> Result<TransportConfig, ConfigError> {
        let defaults = TransportConfig::default();
        let config = TransportConfig {
            ingest_url: self.ingest_url.clone().unwrap_or(defaults.ingest_url),
            api_key: self.api_key.clone().unwrap_or_default(),
            agent_id: self.agent_id.clone().unwrap_or_default(),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            flush_interval: self.flush_interval()?.unwrap_or(defaults.flush_interval),
            connect_timeout: self
                .connect_timeout_ms
                .map_or(defaults.connect_timeout, Duration::from_millis),
            request_timeout: self
                .request_timeout_ms
                .map_or(defaults.request_timeout, Duration::from_millis),
            failure_threshold: self.failure_threshold.unwrap_or(defaults.failure_threshold),
            circuit_breaker_cooldown: self
                .circuit_breaker_cooldown
                .unwrap_or(defaults.circuit_breaker_cooldown),
            warn_interval: self.warn_interval.unwrap_or(defaults.warn_interval),
            user_agent: defaults.user_agent,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build a transport that posts batches over HTTP.
    pub fn build(&self) -> Result<BatchTransport, ConfigError> {
        BatchTransport::new(self.build_config()?)
    }

    /// Build a transport that hands batches to `sender`.
    pub fn build_with_sender<S>(&self, sender: S) -> Result<BatchTransport, ConfigError>
    where
        S: BatchSender + 'static,
    {
        BatchTransport::with_sender(self.build_config()?, sender)
    }
}
