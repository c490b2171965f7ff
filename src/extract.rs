//! Protocol-aware tool name extraction.
//!
//! Each helper maps what an adapter observed about a request to a best-effort
//! tool identifier. Malformed bodies never produce an error; they yield `None`
//! (MCP) or fall back to the request path (A2A).

use serde_json::Value;

/// Largest request or response body, in bytes, kept verbatim on an entry.
pub const BODY_LIMIT: usize = 16_384;

const MCP_TOOLS_CALL: &str = "tools/call";

/// Return the last segment of `path` after stripping trailing slashes.
///
/// The root path `/` yields an empty string.
pub fn extract_http(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_owned()
}

/// Return `params.name` from an MCP `tools/call` JSON-RPC body.
///
/// Any other method, a missing or non-string name, or a body that is not a
/// JSON object yields `None`.
pub fn extract_mcp(body: Option<&str>) -> Option<String> {
    let data = parse_object(body?)?;
    if data.get("method").and_then(Value::as_str) != Some(MCP_TOOLS_CALL) {
        return None;
    }
    data.get("params")?
        .get("name")?
        .as_str()
        .map(str::to_owned)
}

/// Return the A2A `skill_id` from `body`, falling back to the last segment of
/// `path`.
pub fn extract_a2a(body: Option<&str>, path: &str) -> String {
    body.and_then(parse_object)
        .and_then(|data| match data.get("skill_id") {
            Some(Value::String(skill)) if !skill.is_empty() => Some(skill.clone()),
            _ => None,
        })
        .unwrap_or_else(|| extract_http(path))
}

/// Dispatch on the protocol tag.
///
/// `"mcp"` and `"a2a"` are matched exactly; anything else, including `None`,
/// is treated as plain HTTP.
pub fn extract_tool_name(protocol: Option<&str>, body: Option<&str>, path: &str) -> Option<String> {
    match protocol {
        Some("mcp") => extract_mcp(body),
        Some("a2a") => Some(extract_a2a(body, path)),
        _ => Some(extract_http(path)),
    }
}

fn parse_object(body: &str) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_str(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
