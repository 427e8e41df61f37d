//! Request and response envelopes exchanged with the ProxyPin `/messages` endpoint.
//!
//! Outbound calls are wrapped as `tools/call` requests. Responses carry either an
//! `error` or a `result.content` list whose first item's `text` holds the tool's
//! JSON payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{ProxyPinError, Result};

pub const JSONRPC_VERSION: &str = "2.0";
pub const TOOLS_CALL_METHOD: &str = "tools/call";

/// Longest body excerpt carried by a malformed-response error
pub const MAX_BODY_SNIPPET: usize = 500;

/// Longest payload excerpt written to the log on inner parse failure
pub const MAX_PAYLOAD_SNIPPET: usize = 200;

/// Outbound `tools/call` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: ToolCallParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(id: u64, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: TOOLS_CALL_METHOD.to_string(),
            params: ToolCallParams {
                name: name.into(),
                arguments,
            },
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.params.name
    }
}

/// Unwrap a raw response body into the tool's decoded payload.
///
/// The outer envelope must be a JSON object. An `error` key is surfaced as
/// [`ProxyPinError::Envelope`]. Missing or empty `result.content` yields `{}`.
pub fn unwrap_response(body: &str) -> Result<Value> {
    let envelope: Value = serde_json::from_str(body).map_err(|e| ProxyPinError::MalformedResponse {
        reason: e.to_string(),
        snippet: truncate_chars(body, MAX_BODY_SNIPPET),
    })?;

    let envelope = match envelope {
        Value::Object(map) => map,
        other => {
            return Err(ProxyPinError::MalformedResponse {
                reason: "expected a JSON object envelope".to_string(),
                snippet: truncate_chars(&other.to_string(), MAX_BODY_SNIPPET),
            });
        }
    };

    if let Some(error) = envelope.get("error") {
        return Err(ProxyPinError::Envelope(render_verbatim(error)));
    }

    let first = envelope
        .get("result")
        .and_then(|result| result.get("content"))
        .and_then(Value::as_array)
        .and_then(|content| content.first());

    let Some(first) = first else {
        return Ok(Value::Object(Map::new()));
    };

    let text = first.get("text").and_then(Value::as_str).unwrap_or("{}");
    Ok(decode_payload(text))
}

/// Parse the inner payload text, degrading to a wrapper object when it is not JSON
pub fn decode_payload(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            log::error!(
                "Tool payload is not valid JSON: {}, content: {}",
                e,
                truncate_chars(text, MAX_PAYLOAD_SNIPPET)
            );
            json!({
                "raw_response": text,
                "parse_error": e.to_string(),
            })
        }
    }
}

/// Whether a decoded payload is the degraded wrapper produced by [`decode_payload`]
pub fn is_degraded(payload: &Value) -> bool {
    payload.get("raw_response").is_some() && payload.get("parse_error").is_some()
}

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn render_verbatim(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
