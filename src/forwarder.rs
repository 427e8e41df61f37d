//! Tool invocation forwarder
//!
//! Wraps a tool name and arguments in a `tools/call` envelope, sends it through a
//! [`Transport`], and unwraps the response into the tool's JSON payload.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::envelope::{self, ToolCallRequest};
use crate::error::{ProxyPinError, Result};
use crate::id::RequestIdCounter;
use crate::transport::{CallKind, Transport};

pub struct ToolForwarder {
    transport: Arc<dyn Transport>,
    ids: RequestIdCounter,
}

impl ToolForwarder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            ids: RequestIdCounter::new(),
        }
    }

    /// Base URL of the upstream this forwarder talks to
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// The id the next envelope will carry
    pub fn next_request_id(&self) -> u64 {
        self.ids.peek()
    }

    /// Forward a read-only tool call
    pub async fn invoke(&self, tool_name: &str, arguments: Option<Map<String, Value>>) -> Result<Value> {
        self.invoke_as(tool_name, arguments, CallKind::ReadOnly).await
    }

    /// Forward a call that changes upstream state
    pub async fn invoke_mutating(&self, tool_name: &str, arguments: Option<Map<String, Value>>) -> Result<Value> {
        self.invoke_as(tool_name, arguments, CallKind::Mutating).await
    }

    pub async fn invoke_as(
        &self,
        tool_name: &str,
        arguments: Option<Map<String, Value>>,
        kind: CallKind,
    ) -> Result<Value> {
        let tool_name = tool_name.trim();
        if tool_name.is_empty() {
            return Err(ProxyPinError::Validation("tool name must not be empty".to_string()));
        }

        let id = self.ids.next();
        let arguments = arguments.unwrap_or_default();
        let started = Instant::now();

        log::debug!("Calling tool {} (request {}) with {:?}", tool_name, id, arguments);

        let request = ToolCallRequest::new(id, tool_name, arguments);
        let body = self.transport.send(&request, kind).await.inspect_err(|e| {
            log::error!("Tool {} (request {}) failed [{}]: {}", tool_name, id, e.kind(), e);
        })?;

        let payload = envelope::unwrap_response(&body).inspect_err(|e| {
            log::error!("Tool {} (request {}) returned an unusable envelope: {}", tool_name, id, e);
        })?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if payload.as_object().is_some_and(Map::is_empty) {
            log::warn!("Tool {} returned empty content ({:.2}ms)", tool_name, elapsed_ms);
        } else {
            log::info!("Tool {} succeeded in {:.2}ms", tool_name, elapsed_ms);
        }

        Ok(payload)
    }
}
