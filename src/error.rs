//! Error types shared across the SDK.
//!
//! Only [`ConfigError`] and [`EntryError`] ever reach a caller, and only at
//! construction time. [`TransportError`] is produced by a
//! [`BatchSender`](crate::transport::BatchSender) and absorbed inside
//! [`BatchTransport::flush`](crate::transport::BatchTransport::flush).

use thiserror::Error;

/// Errors raised while building a transport or client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid user supplied configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
    /// The TLS connector for the HTTP agent could not be created.
    #[error("failed to initialise TLS connector: {0}")]
    Tls(#[from] native_tls::Error),
}

/// Errors raised while constructing a [`RequestLogEntry`](crate::entry::RequestLogEntry).
#[derive(Debug, Error, PartialEq)]
pub enum EntryError {
    /// Protocol tag outside `{mcp, a2a}`.
    #[error("invalid protocol {0:?}; expected \"mcp\" or \"a2a\"")]
    InvalidProtocol(String),
    /// Response time was negative or not a finite number.
    #[error("response time must be a finite, non-negative number of milliseconds, got {0}")]
    InvalidResponseTime(f64),
    /// x402 payment amount was negative or not a finite number.
    #[error("x402 amount must be a finite, non-negative number, got {0}")]
    InvalidAmount(f64),
    /// A required string field was empty.
    #[error("{0} must not be empty")]
    MissingField(&'static str),
}

/// Failure of a single batch send.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS, or timeout failure.
    #[error("network error: {0}")]
    Network(String),
    /// The endpoint answered with a non-2xx status.
    #[error("ingest endpoint returned status {0}")]
    Status(u16),
    /// The batch could not be encoded as JSON.
    #[error("failed to serialise batch: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The sender has already released its network client.
    #[error("sender is closed")]
    Closed,
}
