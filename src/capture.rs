//! Adapter-side request capture.
//!
//! Framework integrations observe a request as raw facts: method, path,
//! status, elapsed time, body bytes, a handful of headers, and the peer
//! address. [`RequestCapture`] collects those facts and converts them into a
//! [`RequestLogEntry`], applying the body size limit, the header whitelist,
//! and protocol-aware tool name extraction.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::entry::{Protocol, RequestLogEntry};
use crate::error::EntryError;
use crate::extract::{BODY_LIMIT, extract_tool_name};

/// Request headers copied onto an entry. Everything else is discarded.
pub const CAPTURED_HEADERS: [&str; 3] = ["user-agent", "content-type", "referer"];

/// Methods whose request body is kept on the entry.
pub const BODY_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];

/// A body reduced to what an entry stores.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedBody {
    /// Decoded text, absent when the body exceeded [`BODY_LIMIT`].
    pub text: Option<String>,
    /// Size of the original body in bytes.
    pub size: u64,
}

/// Apply the body size limit to `bytes`.
///
/// Bodies up to [`BODY_LIMIT`] bytes are decoded as UTF-8 with invalid
/// sequences dropped; larger bodies keep only their size.
pub fn capture_body(bytes: &[u8]) -> CapturedBody {
    let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    let text = (bytes.len() <= BODY_LIMIT).then(|| {
        bytes
            .utf8_chunks()
            .map(|chunk| chunk.valid())
            .collect::<String>()
    });
    CapturedBody { text, size }
}

/// Facts observed about one request/response pair.
#[derive(Clone, Debug)]
pub struct RequestCapture {
    method: String,
    path: String,
    status_code: u16,
    elapsed: Duration,
    request_body: CapturedBody,
    response_body: CapturedBody,
    headers: BTreeMap<String, String>,
    ip_address: Option<String>,
    customer_id: Option<String>,
    x402_amount: Option<f64>,
    request_id: Option<String>,
}

impl RequestCapture {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        elapsed: Duration,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status_code,
            elapsed,
            request_body: CapturedBody::default(),
            response_body: CapturedBody::default(),
            headers: BTreeMap::new(),
            ip_address: None,
            customer_id: None,
            x402_amount: None,
            request_id: None,
        }
    }

    /// Record the raw request body.
    ///
    /// The body only reaches the entry for [`BODY_METHODS`].
    pub fn with_request_body(mut self, bytes: &[u8]) -> Self {
        self.request_body = capture_body(bytes);
        self
    }

    /// Record the raw response body.
    pub fn with_response_body(mut self, bytes: &[u8]) -> Self {
        self.response_body = capture_body(bytes);
        self
    }

    /// Offer a request header. Names outside [`CAPTURED_HEADERS`] are ignored;
    /// accepted names are stored lowercase.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        if CAPTURED_HEADERS.contains(&name.as_str()) {
            self.headers.insert(name, value.into());
        }
        self
    }

    /// Offer every header in `headers`, keeping only the whitelisted ones.
    pub fn with_headers<'a, I>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        headers
            .into_iter()
            .fold(self, |capture, (name, value)| capture.with_header(name, value))
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_x402_amount(mut self, amount: f64) -> Self {
        self.x402_amount = Some(amount);
        self
    }

    /// Reuse an identifier the adapter already assigned to the request.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn request_body(&self) -> &CapturedBody {
        &self.request_body
    }

    pub fn response_body(&self) -> &CapturedBody {
        &self.response_body
    }

    /// Convert into an entry tagged with `protocol`.
    ///
    /// The tool name is extracted from the captured request body and path.
    /// Request bodies of methods outside [`BODY_METHODS`] are discarded first.
    pub fn into_entry(self, protocol: Option<Protocol>) -> Result<RequestLogEntry, EntryError> {
        let carries_body = BODY_METHODS
            .iter()
            .any(|method| self.method.eq_ignore_ascii_case(method));
        let request_body = if carries_body {
            self.request_body
        } else {
            CapturedBody::default()
        };
        let tool_name = extract_tool_name(
            protocol.map(|p| p.as_str()),
            request_body.text.as_deref(),
            &self.path,
        );
        let response_ms = self.elapsed.as_secs_f64() * 1000.0;

        let mut builder =
            RequestLogEntry::builder(self.method, self.path, self.status_code, response_ms)
                .with_protocol(protocol)
                .with_optional_tool_name(tool_name)
                .with_request_body(request_body.text, request_body.size)
                .with_response_body(self.response_body.text, self.response_body.size)
                .with_headers(self.headers);
        if let Some(ip) = self.ip_address {
            builder = builder.with_ip_address(ip);
        }
        if let Some(customer_id) = self.customer_id {
            builder = builder.with_customer_id(customer_id);
        }
        if let Some(amount) = self.x402_amount {
            builder = builder.with_x402_amount(amount);
        }
        if let Some(request_id) = self.request_id {
            builder = builder.with_request_id(request_id);
        }
        builder.build()
    }
}
