//! Network side of the transport.
//!
//! [`BatchSender`] is the seam between the batching state machine and the
//! wire. [`HttpSender`] posts JSON batches with a pooled `ureq::Agent`; tests
//! substitute an in-process sender.

use std::sync::Arc;

use parking_lot::Mutex;
use ureq::{Agent, AgentBuilder};

use crate::error::{ConfigError, TransportError};

use super::config::TransportConfig;

/// Delivers one serialised batch per call.
///
/// Implementations must not retry internally: a failed batch is re-queued by
/// the transport and retried by a later flush.
pub trait BatchSender: Send + Sync {
    /// Send one JSON batch body. Any non-2xx outcome is an error.
    fn send(&self, payload: &str) -> Result<(), TransportError>;

    /// Release the underlying network client. Must tolerate repeated calls.
    fn close(&self);
}

/// Sender posting batches to the ingest endpoint over HTTP(S).
pub struct HttpSender {
    url: String,
    authorization: String,
    agent: Mutex<Option<Agent>>,
}

impl HttpSender {
    /// Build the connection pool described by `config`.
    pub fn new(config: &TransportConfig) -> Result<Self, ConfigError> {
        let tls = native_tls::TlsConnector::new()?;
        let agent = AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .tls_connector(Arc::new(tls))
            .build();
        Ok(Self {
            url: config.ingest_url.clone(),
            authorization: bearer(&config.api_key),
            agent: Mutex::new(Some(agent)),
        })
    }

    fn agent(&self) -> Option<Agent> {
        self.agent.lock().clone()
    }
}

impl BatchSender for HttpSender {
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        let agent = self.agent().ok_or(TransportError::Closed)?;
        let result = agent
            .post(&self.url)
            .set("Authorization", &self.authorization)
            .set("Content-Type", "application/json")
            .send_string(payload);
        match result {
            Ok(response) => check_status(response.status()),
            Err(ureq::Error::Status(code, _)) => Err(TransportError::Status(code)),
            Err(ureq::Error::Transport(err)) => Err(TransportError::Network(err.to_string())),
        }
    }

    fn close(&self) {
        if self.agent.lock().take().is_some() {
            log::debug!("GT8004 HTTP sender released its connection pool");
        }
    }
}

impl std::fmt::Debug for HttpSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSender")
            .field("url", &self.url)
            .field("closed", &self.agent.lock().is_none())
            .finish()
    }
}

/// Format the `Authorization` header value for `api_key`.
pub(crate) fn bearer(api_key: &str) -> String {
    format!("Bearer {api_key}")
}

/// Map a response status to the send outcome. Only 2xx counts as delivered.
pub(crate) fn check_status(status: u16) -> Result<(), TransportError> {
    match status {
        200..=299 => Ok(()),
        other => Err(TransportError::Status(other)),
    }
}
