//! Tool catalog and dispatch
//!
//! The catalog advertises every tool with its argument schema; `dispatch` routes a
//! named call to its typed request and on through the forwarder.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::error::{ProxyPinError, Result};
use crate::forwarder::ToolForwarder;
use crate::transport::CallKind;

use super::definition::Tool;
use super::requests::*;
use super::system_info::{self, GET_SYSTEM_INFO};

/// Catalog of the tools this server exposes
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Catalog of every ProxyPin tool
    pub fn new() -> Self {
        Self::from_tools(builtin_tools())
    }

    pub fn from_tools(tools: Vec<Tool>) -> Self {
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, tool)| (tool.name.clone(), i))
            .collect();
        Self { tools, index }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools in declaration order
    pub fn all(&self) -> &[Tool] {
        &self.tools
    }

    /// List all tool names
    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// `tools/list` result body
    pub fn to_list_result(&self) -> Value {
        json!({ "tools": self.tools })
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_tools() -> Vec<Tool> {
    vec![
        Tool::for_request::<SearchRequests>(
            "Search captured HTTP requests by URL keyword, method, status, domain, headers, bodies and duration",
        )
        .optional("query", "string", "Keyword matched against the request URL")
        .optional("method", "string", "HTTP method (GET/POST/PUT/DELETE...)")
        .optional("status_code", "string", "Exact status (\"200\") or class (\"2xx\")")
        .optional("domain", "string", "Exact domain match")
        .optional("header_search", "string", "Text searched in request/response headers")
        .optional("request_body_search", "string", "Text searched in request bodies (first 1MB)")
        .optional("response_body_search", "string", "Text searched in response bodies (first 1MB)")
        .optional("min_duration", "integer", "Minimum response time in milliseconds")
        .optional("max_duration", "integer", "Maximum response time in milliseconds")
        .with_default("limit", "integer", "Maximum results (capped at 1000)", json!(20)),
        Tool::for_request::<GetRequestDetails>("Full details of a captured request")
            .required("request_id", "string", "Captured request id"),
        Tool::for_request::<ReplayRequest>("Send a captured request again")
            .required("request_id", "string", "Captured request id"),
        Tool::for_request::<GenerateCode>("Generate client code reproducing a captured request")
            .required("request_id", "string", "Captured request id")
            .with_default(
                "language",
                "string",
                "One of python, javascript, js, curl, php, java, go",
                json!("python"),
            ),
        Tool::for_request::<GetCurl>("cURL command reproducing a captured request")
            .required("request_id", "string", "Captured request id"),
        Tool::for_request::<BlockUrl>("Block requests or responses matching a URL pattern")
            .required("url_pattern", "string", "URL wildcard pattern")
            .with_default(
                "block_type",
                "string",
                "blockRequest or blockResponse",
                json!("blockRequest"),
            ),
        Tool::for_request::<AddResponseRewrite>("Add a response rewrite rule")
            .required("url_pattern", "string", "URL wildcard pattern")
            .required("rewrite_type", "string", "Rewrite kind, e.g. replaceBody, updateHeader")
            .required("value", "string", "New value")
            .optional("key", "string", "Header or field name when the rewrite targets one"),
        Tool::for_request::<AddRequestRewrite>("Add a request rewrite rule")
            .required("url_pattern", "string", "URL wildcard pattern")
            .required("rewrite_type", "string", "Rewrite kind, e.g. addHeader, updateQueryParam")
            .required("key", "string", "Header or parameter name")
            .required("value", "string", "New value"),
        Tool::for_request::<UpdateScript>("Create or update a JavaScript script")
            .required("name", "string", "Script name")
            .required("url_pattern", "string", "URL wildcard pattern the script applies to")
            .required("script_content", "string", "JavaScript source"),
        Tool::for_request::<GetScripts>("List all scripts"),
        Tool::for_request::<SetConfig>("Change ProxyPin settings")
            .optional("system_proxy", "boolean", "Enable the system proxy")
            .optional("ssl_capture", "boolean", "Enable HTTPS interception"),
        Tool::for_request::<AddHostMapping>("Add a hosts mapping")
            .required("domain", "string", "Domain to remap")
            .required("ip", "string", "Target IP address"),
        Tool::for_request::<GetProxyStatus>("Current proxy status"),
        Tool::for_request::<ExportHar>("Export captured requests as HAR")
            .with_default("limit", "integer", "Maximum entries", json!(100)),
        Tool::for_request::<ImportHar>("Import a HAR document into ProxyPin")
            .required("har_content", "string", "HAR JSON text"),
        Tool::for_request::<StartProxy>("Start the proxy server")
            .with_default("port", "integer", "Proxy listen port", json!(9099)),
        Tool::for_request::<StopProxy>("Stop the proxy server"),
        Tool::for_request::<GetRecentRequests>(
            "Recent captured requests (legacy; prefer search_requests)",
        )
        .with_default("limit", "integer", "Maximum results", json!(20))
        .optional("url_filter", "string", "Substring the URL must contain")
        .optional("method", "string", "HTTP method"),
        Tool::for_request::<ClearRequests>("Clear all captured requests"),
        Tool::for_request::<GetStatistics>(
            "Capture statistics: totals, method/status/domain distribution, size, average duration, errors",
        ),
        Tool::for_request::<CompareRequests>(
            "Diff two captured requests: headers, bodies (JSON-aware) and duration",
        )
        .required("request_id_1", "string", "First request id")
        .required("request_id_2", "string", "Second request id"),
        Tool::for_request::<FindSimilarRequests>(
            "Requests sharing domain, path and method with the given one",
        )
        .required("request_id", "string", "Captured request id")
        .with_default("limit", "integer", "Maximum results", json!(10)),
        Tool::for_request::<ExtractApiEndpoints>(
            "Group captured traffic into unique API endpoints with counts and status codes",
        )
        .optional("domain_filter", "string", "Only endpoints on this domain"),
        Tool::new(GET_SYSTEM_INFO, "Version and feature information for this server"),
    ]
}

/// Deserialize raw client arguments into a typed request
pub fn parse_arguments<T: ToolRequest>(arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| ProxyPinError::Validation(format!("invalid arguments for {}: {}", T::NAME, e)))
}

async fn forward<T: ToolRequest>(forwarder: &ToolForwarder, arguments: Value) -> Result<Value> {
    let request: T = parse_arguments(arguments)?;
    let arguments = request.into_arguments()?;
    forwarder
        .invoke_as(T::NAME, Some(arguments), CallKind::from_mutating(T::MUTATING))
        .await
}

/// Run the named tool with raw client arguments
pub async fn dispatch(forwarder: &ToolForwarder, name: &str, arguments: Value) -> Result<Value> {
    log::info!("Executing tool {} with {}", name, arguments);

    match name {
        SearchRequests::NAME => forward::<SearchRequests>(forwarder, arguments).await,
        GetRequestDetails::NAME => forward::<GetRequestDetails>(forwarder, arguments).await,
        ReplayRequest::NAME => forward::<ReplayRequest>(forwarder, arguments).await,
        GenerateCode::NAME => forward::<GenerateCode>(forwarder, arguments).await,
        GetCurl::NAME => forward::<GetCurl>(forwarder, arguments).await,
        BlockUrl::NAME => forward::<BlockUrl>(forwarder, arguments).await,
        AddResponseRewrite::NAME => forward::<AddResponseRewrite>(forwarder, arguments).await,
        AddRequestRewrite::NAME => forward::<AddRequestRewrite>(forwarder, arguments).await,
        UpdateScript::NAME => forward::<UpdateScript>(forwarder, arguments).await,
        GetScripts::NAME => forward::<GetScripts>(forwarder, arguments).await,
        SetConfig::NAME => forward::<SetConfig>(forwarder, arguments).await,
        AddHostMapping::NAME => forward::<AddHostMapping>(forwarder, arguments).await,
        GetProxyStatus::NAME => forward::<GetProxyStatus>(forwarder, arguments).await,
        ExportHar::NAME => forward::<ExportHar>(forwarder, arguments).await,
        ImportHar::NAME => forward::<ImportHar>(forwarder, arguments).await,
        StartProxy::NAME => forward::<StartProxy>(forwarder, arguments).await,
        StopProxy::NAME => forward::<StopProxy>(forwarder, arguments).await,
        GetRecentRequests::NAME => forward::<GetRecentRequests>(forwarder, arguments).await,
        ClearRequests::NAME => forward::<ClearRequests>(forwarder, arguments).await,
        GetStatistics::NAME => forward::<GetStatistics>(forwarder, arguments).await,
        CompareRequests::NAME => forward::<CompareRequests>(forwarder, arguments).await,
        FindSimilarRequests::NAME => forward::<FindSimilarRequests>(forwarder, arguments).await,
        ExtractApiEndpoints::NAME => forward::<ExtractApiEndpoints>(forwarder, arguments).await,
        GET_SYSTEM_INFO => Ok(system_info::system_info(forwarder.endpoint())),
        other => Err(ProxyPinError::Validation(format!("unknown tool: {}", other))),
    }
}
