//! Batch payload sent to the ingest endpoint.
//!
//! A [`LogBatch`] borrows the agent identifier and the snapshot of entries so
//! that building the payload at send time does not clone any entry.

use serde::Serialize;

use crate::entry::RequestLogEntry;
use crate::error::TransportError;

/// SDK version reported with every batch.
pub const SDK_VERSION: &str = concat!("rust-", env!("CARGO_PKG_VERSION"));

/// One network call's worth of entries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogBatch<'a> {
    pub agent_id: &'a str,
    pub sdk_version: &'static str,
    pub entries: &'a [RequestLogEntry],
}

impl<'a> LogBatch<'a> {
    /// Group `entries` under `agent_id`.
    pub fn new(agent_id: &'a str, entries: &'a [RequestLogEntry]) -> Self {
        Self {
            agent_id,
            sdk_version: SDK_VERSION,
            entries,
        }
    }

    /// Encode the batch as the JSON request body.
    pub fn to_json(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(TransportError::from)
    }
}
