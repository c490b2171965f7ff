//! Helpers shared by unit and integration tests.
//!
//! Compiled for this crate's unit tests and, through the `test-util` feature,
//! for the integration tests under `tests/`.

pub mod mock_server;
pub mod recording_sender;

pub use recording_sender::RecordingSender;

use crate::entry::RequestLogEntry;

/// A minimal `GET /test` entry with the given request id.
pub fn entry(request_id: &str) -> RequestLogEntry {
    RequestLogEntry::builder("GET", "/test", 200, 5.0)
        .with_request_id(request_id)
        .build()
        .expect("valid entry")
}
