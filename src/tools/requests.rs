//! Typed argument structs, one per forwarded tool.
//!
//! Each struct deserializes the client's raw arguments, normalizes them, and
//! produces the mapping sent upstream. Validation failures surface before any
//! network I/O.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};

use crate::error::{ProxyPinError, Result};

/// Upper bound on `search_requests` results
pub const MAX_SEARCH_LIMIT: u32 = 1000;

/// Languages accepted by `generate_code`
pub const SUPPORTED_LANGUAGES: &[&str] = &["python", "javascript", "js", "curl", "php", "java", "go"];

/// A tool whose arguments are forwarded to ProxyPin
pub trait ToolRequest: for<'de> Deserialize<'de> {
    const NAME: &'static str;

    /// Whether the call changes upstream state
    const MUTATING: bool = false;

    fn into_arguments(self) -> Result<Map<String, Value>>;
}

/// Trim an identifier, rejecting blank values
pub fn required_id(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProxyPinError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn insert_nonempty(args: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        args.insert(key.to_string(), Value::String(value));
    }
}

/// Arguments must serialize to a JSON object; anything else is a bug in the request type
fn object(tool: &str, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ProxyPinError::Request(format!(
            "{} arguments must be a JSON object, got {}",
            tool, other
        ))),
    }
}

/// Accept `"2xx"`, `"200"` or `200`
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

fn default_search_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchRequests {
    pub query: Option<String>,
    pub method: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub status_code: Option<String>,
    pub domain: Option<String>,
    pub header_search: Option<String>,
    pub request_body_search: Option<String>,
    pub response_body_search: Option<String>,
    pub min_duration: Option<i64>,
    pub max_duration: Option<i64>,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

impl ToolRequest for SearchRequests {
    const NAME: &'static str = "search_requests";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        let mut args = Map::new();
        args.insert("limit".to_string(), json!(self.limit.min(MAX_SEARCH_LIMIT)));

        insert_nonempty(&mut args, "query", self.query.map(|q| q.trim().to_string()));
        insert_nonempty(&mut args, "method", self.method.map(|m| m.trim().to_uppercase()));
        insert_nonempty(&mut args, "status_code", self.status_code.map(|s| s.trim().to_string()));
        insert_nonempty(&mut args, "domain", self.domain.map(|d| d.trim().to_lowercase()));
        insert_nonempty(&mut args, "header_search", self.header_search);
        insert_nonempty(&mut args, "request_body_search", self.request_body_search);
        insert_nonempty(&mut args, "response_body_search", self.response_body_search);

        if let Some(min) = self.min_duration {
            args.insert("min_duration".to_string(), json!(min.max(0)));
        }
        if let Some(max) = self.max_duration {
            args.insert("max_duration".to_string(), json!(max.max(0)));
        }
        Ok(args)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetRequestDetails {
    pub request_id: String,
}

impl ToolRequest for GetRequestDetails {
    const NAME: &'static str = "get_request_details";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({ "request_id": required_id("request_id", &self.request_id)? }))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayRequest {
    pub request_id: String,
}

impl ToolRequest for ReplayRequest {
    const NAME: &'static str = "replay_request";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({ "request_id": required_id("request_id", &self.request_id)? }))
    }
}

fn default_language() -> String {
    "python".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateCode {
    pub request_id: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl ToolRequest for GenerateCode {
    const NAME: &'static str = "generate_code";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        let request_id = required_id("request_id", &self.request_id)?;
        let language = self.language.trim().to_lowercase();
        if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            return Err(ProxyPinError::Validation(format!(
                "unsupported language: {}, supported languages: {}",
                language,
                SUPPORTED_LANGUAGES.join(", ")
            )));
        }
        object(Self::NAME, json!({ "request_id": request_id, "language": language }))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetCurl {
    pub request_id: String,
}

impl ToolRequest for GetCurl {
    const NAME: &'static str = "get_curl";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({ "request_id": required_id("request_id", &self.request_id)? }))
    }
}

fn default_block_type() -> String {
    "blockRequest".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockUrl {
    pub url_pattern: String,
    #[serde(default = "default_block_type")]
    pub block_type: String,
}

impl ToolRequest for BlockUrl {
    const NAME: &'static str = "block_url";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({ "url_pattern": self.url_pattern, "block_type": self.block_type }))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddResponseRewrite {
    pub url_pattern: String,
    pub rewrite_type: String,
    pub value: String,
    pub key: Option<String>,
}

impl ToolRequest for AddResponseRewrite {
    const NAME: &'static str = "add_response_rewrite";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        let mut args = object(Self::NAME, json!({
            "url_pattern": self.url_pattern,
            "rewrite_type": self.rewrite_type,
            "value": self.value,
        }))?;
        insert_nonempty(&mut args, "key", self.key);
        Ok(args)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddRequestRewrite {
    pub url_pattern: String,
    pub rewrite_type: String,
    pub key: String,
    pub value: String,
}

impl ToolRequest for AddRequestRewrite {
    const NAME: &'static str = "add_request_rewrite";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({
            "url_pattern": self.url_pattern,
            "rewrite_type": self.rewrite_type,
            "key": self.key,
            "value": self.value,
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateScript {
    pub name: String,
    pub url_pattern: String,
    pub script_content: String,
}

impl ToolRequest for UpdateScript {
    const NAME: &'static str = "update_script";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({
            "name": self.name,
            "url_pattern": self.url_pattern,
            "script_content": self.script_content,
        }))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetScripts {}

impl ToolRequest for GetScripts {
    const NAME: &'static str = "get_scripts";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        Ok(Map::new())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetConfig {
    pub system_proxy: Option<bool>,
    pub ssl_capture: Option<bool>,
}

impl ToolRequest for SetConfig {
    const NAME: &'static str = "set_config";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        let mut args = Map::new();
        if let Some(system_proxy) = self.system_proxy {
            args.insert("system_proxy".to_string(), Value::Bool(system_proxy));
        }
        if let Some(ssl_capture) = self.ssl_capture {
            args.insert("ssl_capture".to_string(), Value::Bool(ssl_capture));
        }
        Ok(args)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddHostMapping {
    pub domain: String,
    pub ip: String,
}

impl ToolRequest for AddHostMapping {
    const NAME: &'static str = "add_host_mapping";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({ "domain": self.domain, "ip": self.ip }))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetProxyStatus {}

impl ToolRequest for GetProxyStatus {
    const NAME: &'static str = "get_proxy_status";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        Ok(Map::new())
    }
}

fn default_har_limit() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportHar {
    #[serde(default = "default_har_limit")]
    pub limit: u32,
}

impl ToolRequest for ExportHar {
    const NAME: &'static str = "export_har";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({ "limit": self.limit }))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportHar {
    pub har_content: String,
}

impl ToolRequest for ImportHar {
    const NAME: &'static str = "import_har";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({ "har_content": self.har_content }))
    }
}

fn default_proxy_port() -> u16 {
    9099
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartProxy {
    #[serde(default = "default_proxy_port")]
    pub port: u16,
}

impl ToolRequest for StartProxy {
    const NAME: &'static str = "start_proxy";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({ "port": self.port }))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StopProxy {}

impl ToolRequest for StopProxy {
    const NAME: &'static str = "stop_proxy";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        Ok(Map::new())
    }
}

fn default_recent_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetRecentRequests {
    #[serde(default = "default_recent_limit")]
    pub limit: u32,
    pub url_filter: Option<String>,
    pub method: Option<String>,
}

impl ToolRequest for GetRecentRequests {
    const NAME: &'static str = "get_recent_requests";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        let mut args = object(Self::NAME, json!({ "limit": self.limit }))?;
        insert_nonempty(&mut args, "url_filter", self.url_filter);
        insert_nonempty(&mut args, "method", self.method);
        Ok(args)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClearRequests {}

impl ToolRequest for ClearRequests {
    const NAME: &'static str = "clear_requests";
    const MUTATING: bool = true;

    fn into_arguments(self) -> Result<Map<String, Value>> {
        Ok(Map::new())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetStatistics {}

impl ToolRequest for GetStatistics {
    const NAME: &'static str = "get_statistics";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        Ok(Map::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareRequests {
    pub request_id_1: String,
    pub request_id_2: String,
}

impl ToolRequest for CompareRequests {
    const NAME: &'static str = "compare_requests";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({
            "request_id_1": required_id("request_id_1", &self.request_id_1)?,
            "request_id_2": required_id("request_id_2", &self.request_id_2)?,
        }))
    }
}

fn default_similar_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindSimilarRequests {
    pub request_id: String,
    #[serde(default = "default_similar_limit")]
    pub limit: u32,
}

impl ToolRequest for FindSimilarRequests {
    const NAME: &'static str = "find_similar_requests";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        object(Self::NAME, json!({
            "request_id": required_id("request_id", &self.request_id)?,
            "limit": self.limit,
        }))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractApiEndpoints {
    pub domain_filter: Option<String>,
}

impl ToolRequest for ExtractApiEndpoints {
    const NAME: &'static str = "extract_api_endpoints";

    fn into_arguments(self) -> Result<Map<String, Value>> {
        let mut args = Map::new();
        insert_nonempty(&mut args, "domain_filter", self.domain_filter);
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: ToolRequest>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_required_id_trims() {
        assert_eq!(required_id("request_id", "  42 ").unwrap(), "42");
    }

    #[test]
    fn test_required_id_rejects_blank() {
        for blank in ["", "   ", "\t\n"] {
            let err = required_id("request_id", blank).unwrap_err();
            assert!(matches!(err, ProxyPinError::Validation(_)));
            assert!(err.to_string().contains("request_id"));
        }
    }

    #[test]
    fn test_search_requests_defaults() {
        let args = parse::<SearchRequests>(json!({})).into_arguments().unwrap();
        assert_eq!(Value::Object(args), json!({"limit": 20}));
    }

    #[test]
    fn test_search_requests_normalizes() {
        let request: SearchRequests = parse(json!({
            "query": "  /api/login ",
            "method": "post",
            "status_code": "2xx",
            "domain": "Example.COM",
            "header_search": "",
            "min_duration": -5,
            "max_duration": 300,
            "limit": 5000
        }));
        let args = request.into_arguments().unwrap();
        assert_eq!(
            Value::Object(args),
            json!({
                "limit": 1000,
                "query": "/api/login",
                "method": "POST",
                "status_code": "2xx",
                "domain": "example.com",
                "min_duration": 0,
                "max_duration": 300
            })
        );
    }

    #[test]
    fn test_search_requests_numeric_status_code() {
        let request: SearchRequests = parse(json!({"status_code": 404}));
        let args = request.into_arguments().unwrap();
        assert_eq!(args["status_code"], "404");
    }

    #[test]
    fn test_search_requests_rejects_unknown_field() {
        let result = serde_json::from_value::<SearchRequests>(json!({"qeury": "typo"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_identifier_tools_reject_blank_ids() {
        assert!(parse::<GetRequestDetails>(json!({"request_id": " "})).into_arguments().is_err());
        assert!(parse::<ReplayRequest>(json!({"request_id": ""})).into_arguments().is_err());
        assert!(parse::<GetCurl>(json!({"request_id": "\t"})).into_arguments().is_err());
        assert!(parse::<GenerateCode>(json!({"request_id": ""})).into_arguments().is_err());
        assert!(
            parse::<CompareRequests>(json!({"request_id_1": "1", "request_id_2": " "}))
                .into_arguments()
                .is_err()
        );
        assert!(parse::<FindSimilarRequests>(json!({"request_id": ""})).into_arguments().is_err());
    }

    #[test]
    fn test_get_request_details_trims_id() {
        let args = parse::<GetRequestDetails>(json!({"request_id": " 17 "})).into_arguments().unwrap();
        assert_eq!(Value::Object(args), json!({"request_id": "17"}));
    }

    #[test]
    fn test_generate_code_defaults_to_python() {
        let args = parse::<GenerateCode>(json!({"request_id": "1"})).into_arguments().unwrap();
        assert_eq!(args["language"], "python");
    }

    #[test]
    fn test_generate_code_normalizes_language() {
        let args = parse::<GenerateCode>(json!({"request_id": "1", "language": " CURL "}))
            .into_arguments()
            .unwrap();
        assert_eq!(args["language"], "curl");
    }

    #[test]
    fn test_generate_code_rejects_unknown_language() {
        let err = parse::<GenerateCode>(json!({"request_id": "1", "language": "cobol"}))
            .into_arguments()
            .unwrap_err();
        assert!(err.to_string().contains("cobol"));
        assert!(err.to_string().contains("python"));
    }

    #[test]
    fn test_block_url_default_type() {
        let args = parse::<BlockUrl>(json!({"url_pattern": "*ads*"})).into_arguments().unwrap();
        assert_eq!(args["block_type"], "blockRequest");
        assert!(BlockUrl::MUTATING);
    }

    #[test]
    fn test_add_response_rewrite_optional_key() {
        let without = parse::<AddResponseRewrite>(json!({
            "url_pattern": "*/api/*", "rewrite_type": "replaceBody", "value": "{}"
        }))
        .into_arguments()
        .unwrap();
        assert!(!without.contains_key("key"));

        let with = parse::<AddResponseRewrite>(json!({
            "url_pattern": "*/api/*", "rewrite_type": "updateHeader", "value": "1", "key": "X-Test"
        }))
        .into_arguments()
        .unwrap();
        assert_eq!(with["key"], "X-Test");
    }

    #[test]
    fn test_add_request_rewrite_requires_all_fields() {
        let result = serde_json::from_value::<AddRequestRewrite>(json!({
            "url_pattern": "*", "rewrite_type": "addHeader", "value": "1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_set_config_only_sends_present_flags() {
        let args = parse::<SetConfig>(json!({"ssl_capture": true})).into_arguments().unwrap();
        assert_eq!(Value::Object(args), json!({"ssl_capture": true}));

        let args = parse::<SetConfig>(json!({})).into_arguments().unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_defaults_for_limits_and_port() {
        assert_eq!(parse::<ExportHar>(json!({})).into_arguments().unwrap()["limit"], 100);
        assert_eq!(parse::<StartProxy>(json!({})).into_arguments().unwrap()["port"], 9099);
        assert_eq!(parse::<GetRecentRequests>(json!({})).into_arguments().unwrap()["limit"], 20);
        assert_eq!(
            parse::<FindSimilarRequests>(json!({"request_id": "9"})).into_arguments().unwrap()["limit"],
            10
        );
    }

    #[test]
    fn test_start_proxy_rejects_out_of_range_port() {
        assert!(serde_json::from_value::<StartProxy>(json!({"port": 70000})).is_err());
    }

    #[test]
    fn test_get_recent_requests_optional_filters() {
        let args = parse::<GetRecentRequests>(json!({"limit": 5, "method": "GET"}))
            .into_arguments()
            .unwrap();
        assert_eq!(Value::Object(args), json!({"limit": 5, "method": "GET"}));
    }

    #[test]
    fn test_extract_api_endpoints_filter() {
        let args = parse::<ExtractApiEndpoints>(json!({"domain_filter": "api.example.com"}))
            .into_arguments()
            .unwrap();
        assert_eq!(args["domain_filter"], "api.example.com");
        assert!(parse::<ExtractApiEndpoints>(json!({})).into_arguments().unwrap().is_empty());
    }

    #[test]
    fn test_mutating_flags() {
        assert!(!SearchRequests::MUTATING);
        assert!(!GetStatistics::MUTATING);
        assert!(ReplayRequest::MUTATING);
        assert!(StartProxy::MUTATING);
        assert!(StopProxy::MUTATING);
        assert!(ClearRequests::MUTATING);
        assert!(ImportHar::MUTATING);
    }

    #[test]
    fn test_object_rejects_non_objects() {
        for value in [Value::Null, json!([1, 2]), json!("request_id"), json!(7)] {
            let err = object("get_curl", value.clone()).unwrap_err();
            assert!(matches!(err, ProxyPinError::Request(_)), "{}", value);
            assert!(err.to_string().contains("get_curl"));
        }
        let map = object("get_curl", json!({"request_id": "r1"})).unwrap();
        assert_eq!(map.get("request_id"), Some(&json!("r1")));
    }
}
