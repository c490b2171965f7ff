//! Request log entry representation.
//!
//! A [`RequestLogEntry`] captures one observed request/response pair. Entries
//! are immutable once built; the builder validates the protocol tag and the
//! response time before an entry can exist. Serialisation uses the camelCase
//! wire names expected by the ingest endpoint and omits absent fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::EntryError;

/// Marker identifying entries produced by this SDK.
pub const SOURCE_SDK: &str = "sdk";

/// Request protocols with dedicated tool name extraction.
///
/// Plain HTTP traffic carries no protocol tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Model Context Protocol JSON-RPC traffic.
    Mcp,
    /// Agent-to-agent task traffic.
    A2a,
}

impl Protocol {
    /// Wire representation of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mcp => "mcp",
            Self::A2a => "a2a",
        }
    }

    /// Parse an optional protocol tag, rejecting anything but `mcp` or `a2a`.
    pub fn parse_optional(tag: Option<&str>) -> Result<Option<Self>, EntryError> {
        tag.map(str::parse::<Self>).transpose()
    }
}

impl std::str::FromStr for Protocol {
    type Err = EntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcp" => Ok(Self::Mcp),
            "a2a" => Ok(Self::A2a),
            other => Err(EntryError::InvalidProtocol(other.to_owned())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    request_id: String,
    method: String,
    path: String,
    status_code: u16,
    response_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol: Option<Protocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x402_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_body: Option<String>,
    request_body_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_body: Option<String>,
    response_body_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,
    timestamp: String,
    source: &'static str,
}

impl RequestLogEntry {
    /// Start building an entry from the fields every request has.
    pub fn builder(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        response_ms: f64,
    ) -> RequestLogEntryBuilder {
        RequestLogEntryBuilder::new(method, path, status_code, response_ms)
    }

    /// Generate a fresh request identifier (UUID v4, hyphenated).
    pub fn generate_request_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn response_ms(&self) -> f64 {
        self.response_ms
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn x402_amount(&self) -> Option<f64> {
        self.x402_amount
    }

    pub fn request_body(&self) -> Option<&str> {
        self.request_body.as_deref()
    }

    pub fn request_body_size(&self) -> u64 {
        self.request_body_size
    }

    pub fn response_body(&self) -> Option<&str> {
        self.response_body.as_deref()
    }

    pub fn response_body_size(&self) -> u64 {
        self.response_body_size
    }

    pub fn headers(&self) -> Option<&BTreeMap<String, String>> {
        self.headers.as_ref()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// ISO-8601 UTC timestamp with a trailing `Z`.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Always [`SOURCE_SDK`].
    pub fn source(&self) -> &'static str {
        self.source
    }
}

impl fmt::Display for RequestLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({:.1} ms) [{}]",
            self.method, self.path, self.status_code, self.response_ms, self.request_id
        )
    }
}

/// Current UTC time as ISO-8601 with microseconds and a literal `Z`.
pub fn utc_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

/// Builder for [`RequestLogEntry`].
///
/// Optional fields default to absent; `request_id` and `timestamp` are
/// generated at [`build`](Self::build) time unless supplied.
#[derive(Clone, Debug)]
pub struct RequestLogEntryBuilder {
    request_id: Option<String>,
    method: String,
    path: String,
    status_code: u16,
    response_ms: f64,
    protocol: Option<String>,
    tool_name: Option<String>,
    customer_id: Option<String>,
    x402_amount: Option<f64>,
    request_body: Option<String>,
    request_body_size: u64,
    response_body: Option<String>,
    response_body_size: u64,
    headers: Option<BTreeMap<String, String>>,
    ip_address: Option<String>,
    timestamp: Option<String>,
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: impl Into<String>) -> Self {
            self.$field = Some(value.into());
            self
        }
    };
}

impl RequestLogEntryBuilder {
    fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        response_ms: f64,
    ) -> Self {
        Self {
            request_id: None,
            method: method.into(),
            path: path.into(),
            status_code,
            response_ms,
            protocol: None,
            tool_name: None,
            customer_id: None,
            x402_amount: None,
            request_body: None,
            request_body_size: 0,
            response_body: None,
            response_body_size: 0,
            headers: None,
            ip_address: None,
            timestamp: None,
        }
    }

    option_setter!(
        #[doc = "Use a caller supplied request identifier."]
        with_request_id,
        request_id
    );
    option_setter!(
        #[doc = "Set the protocol tag; validated at build time."]
        with_protocol_tag,
        protocol
    );
    option_setter!(
        #[doc = "Set the extracted tool name."]
        with_tool_name,
        tool_name
    );
    option_setter!(
        #[doc = "Attribute the request to a customer."]
        with_customer_id,
        customer_id
    );
    option_setter!(
        #[doc = "Record the client IP address."]
        with_ip_address,
        ip_address
    );
    option_setter!(
        #[doc = "Override the generated timestamp."]
        with_timestamp,
        timestamp
    );

    /// Set the protocol from an already validated value.
    pub fn with_protocol(mut self, protocol: Option<Protocol>) -> Self {
        self.protocol = protocol.map(|p| p.as_str().to_owned());
        self
    }

    /// Set the tool name if one was extracted.
    pub fn with_optional_tool_name(mut self, tool_name: Option<String>) -> Self {
        self.tool_name = tool_name;
        self
    }

    /// Record an x402 payment amount.
    pub fn with_x402_amount(mut self, amount: f64) -> Self {
        self.x402_amount = Some(amount);
        self
    }

    /// Attach the captured request body and its full size in bytes.
    pub fn with_request_body(mut self, body: Option<String>, size: u64) -> Self {
        self.request_body = body;
        self.request_body_size = size;
        self
    }

    /// Attach the captured response body and its full size in bytes.
    pub fn with_response_body(mut self, body: Option<String>, size: u64) -> Self {
        self.response_body = body;
        self.response_body_size = size;
        self
    }

    /// Attach captured headers; an empty map is treated as absent.
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = (!headers.is_empty()).then_some(headers);
        self
    }

    /// Validate and produce the immutable entry.
    pub fn build(self) -> Result<RequestLogEntry, EntryError> {
        let protocol = Protocol::parse_optional(self.protocol.as_deref())?;
        if !self.response_ms.is_finite() || self.response_ms < 0.0 {
            return Err(EntryError::InvalidResponseTime(self.response_ms));
        }
        if let Some(amount) = self.x402_amount.filter(|a| !a.is_finite() || *a < 0.0) {
            return Err(EntryError::InvalidAmount(amount));
        }
        if self.method.is_empty() {
            return Err(EntryError::MissingField("method"));
        }
        let request_id = match self.request_id {
            Some(id) if id.is_empty() => return Err(EntryError::MissingField("request_id")),
            Some(id) => id,
            None => RequestLogEntry::generate_request_id(),
        };
        Ok(RequestLogEntry {
            request_id,
            method: self.method,
            path: self.path,
            status_code: self.status_code,
            response_ms: self.response_ms,
            protocol,
            tool_name: self.tool_name,
            customer_id: self.customer_id,
            x402_amount: self.x402_amount,
            request_body: self.request_body,
            request_body_size: self.request_body_size,
            response_body: self.response_body,
            response_body_size: self.response_body_size,
            headers: self.headers,
            ip_address: self.ip_address,
            timestamp: self.timestamp.unwrap_or_else(utc_timestamp),
            source: SOURCE_SDK,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn minimal() -> RequestLogEntryBuilder {
        RequestLogEntry::builder("GET", "/test", 200, 5.0).with_request_id("r1")
    }

    #[rstest]
    fn required_fields_and_source(minimal: RequestLogEntryBuilder) {
        let entry = minimal.build().expect("build");
        assert_eq!(entry.request_id(), "r1");
        assert_eq!(entry.method(), "GET");
        assert_eq!(entry.status_code(), 200);
        assert_eq!(entry.source(), "sdk");
        assert_eq!(entry.protocol(), None);
    }

    #[rstest]
    #[case("mcp", Protocol::Mcp)]
    #[case("a2a", Protocol::A2a)]
    fn accepts_known_protocols(
        minimal: RequestLogEntryBuilder,
        #[case] tag: &str,
        #[case] expected: Protocol,
    ) {
        let entry = minimal.with_protocol_tag(tag).build().expect("build");
        assert_eq!(entry.protocol(), Some(expected));
    }

    #[rstest]
    #[case("http")]
    #[case("MCP")]
    #[case("")]
    fn rejects_unknown_protocols(minimal: RequestLogEntryBuilder, #[case] tag: &str) {
        let err = minimal.with_protocol_tag(tag).build().expect_err("must fail");
        assert_eq!(err, EntryError::InvalidProtocol(tag.to_owned()));
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_bad_response_times(#[case] response_ms: f64) {
        let result = RequestLogEntry::builder("GET", "/", 200, response_ms).build();
        assert!(matches!(result, Err(EntryError::InvalidResponseTime(_))));
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(f64::NEG_INFINITY)]
    #[case(-1.0)]
    fn rejects_bad_x402_amounts(minimal: RequestLogEntryBuilder, #[case] amount: f64) {
        let result = minimal.with_x402_amount(amount).build();
        assert!(matches!(result, Err(EntryError::InvalidAmount(_))));
    }

    #[rstest]
    fn x402_amount_serialises_when_valid(minimal: RequestLogEntryBuilder) {
        let entry = minimal.with_x402_amount(0.5).build().expect("build");
        let wire = serde_json::to_value(&entry).expect("json");
        assert_eq!(wire["x402Amount"], 0.5);

        let entry = RequestLogEntry::builder("GET", "/", 200, 0.0)
            .build()
            .expect("build");
        let wire = serde_json::to_value(&entry).expect("json");
        assert!(wire.get("x402Amount").is_none());
    }

    #[rstest]
    fn rejects_empty_request_id() {
        let result = RequestLogEntry::builder("GET", "/", 200, 0.0)
            .with_request_id("")
            .build();
        assert_eq!(result, Err(EntryError::MissingField("request_id")));
    }

    #[rstest]
    fn generates_uuid_request_id_and_timestamp() {
        let entry = RequestLogEntry::builder("GET", "/", 200, 0.0)
            .build()
            .expect("build");
        assert_eq!(entry.request_id().len(), 36);
        assert!(entry.timestamp().ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(entry.timestamp()).is_ok());
    }

    #[rstest]
    fn serialises_camel_case(minimal: RequestLogEntryBuilder) {
        let entry = minimal
            .with_tool_name("search")
            .with_protocol(Some(Protocol::Mcp))
            .with_x402_amount(0.25)
            .build()
            .expect("build");
        let value = serde_json::to_value(&entry).expect("serialise");
        assert_eq!(value["requestId"], "r1");
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["responseMs"], 5.0);
        assert_eq!(value["toolName"], "search");
        assert_eq!(value["protocol"], "mcp");
        assert_eq!(value["x402Amount"], 0.25);
        assert_eq!(value["requestBodySize"], 0);
        assert_eq!(value["source"], "sdk");
    }

    #[rstest]
    fn omits_absent_fields(minimal: RequestLogEntryBuilder) {
        let entry = minimal.with_headers(BTreeMap::new()).build().expect("build");
        let value = serde_json::to_value(&entry).expect("serialise");
        let object = value.as_object().expect("object");
        for key in [
            "customerId",
            "toolName",
            "requestBody",
            "responseBody",
            "headers",
            "ipAddress",
            "protocol",
            "x402Amount",
        ] {
            assert!(!object.contains_key(key), "{key} should be omitted");
        }
    }
}
