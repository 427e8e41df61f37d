//! Error types for proxypin-mcp
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while forwarding a tool call
#[derive(Debug, Error)]
pub enum ProxyPinError {
    /// Caller supplied a blank or malformed argument; no request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Outbound call exceeded the configured timeout after retries
    #[error("ProxyPin connection timed out: check that the service is running at {endpoint}")]
    Timeout { endpoint: String },

    /// Upstream endpoint unreachable
    #[error("Unable to connect to ProxyPin: make sure the service is running at {endpoint} ({reason})")]
    Connection { endpoint: String, reason: String },

    /// Non-2xx status not resolved by retry
    #[error("ProxyPin HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Upstream executed the call but reported a failure in the envelope
    #[error("MCP Error: {0}")]
    Envelope(String),

    /// Outer envelope was not valid JSON
    #[error("ProxyPin returned an invalid JSON response: {reason} (body: {snippet})")]
    MalformedResponse { reason: String, snippet: String },

    /// Any other transport failure
    #[error("ProxyPin request failed: {0}")]
    Request(String),

    /// Bad configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProxyPinError {
    /// Stable short label for log records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection",
            Self::Http { .. } => "http",
            Self::Envelope(_) => "envelope",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Request(_) => "request",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Result type alias for proxypin-mcp operations
pub type Result<T> = std::result::Result<T, ProxyPinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = ProxyPinError::Validation("request_id must not be empty".to_string());
        assert_eq!(err.to_string(), "Validation error: request_id must not be empty");
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_timeout_error_names_endpoint() {
        let err = ProxyPinError::Timeout {
            endpoint: "http://127.0.0.1:17777".to_string(),
        };
        assert!(err.to_string().contains("http://127.0.0.1:17777"));
    }

    #[test]
    fn test_connection_error_names_endpoint() {
        let err = ProxyPinError::Connection {
            endpoint: "http://127.0.0.1:1".to_string(),
            reason: "connection refused".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("http://127.0.0.1:1"));
        assert!(msg.contains("connection refused"));
        assert_eq!(err.kind(), "connection");
    }

    #[test]
    fn test_http_error() {
        let err = ProxyPinError::Http {
            status: 502,
            message: "Bad Gateway".to_string(),
        };
        assert_eq!(err.to_string(), "ProxyPin HTTP error 502: Bad Gateway");
    }

    #[test]
    fn test_envelope_error_is_verbatim() {
        let err = ProxyPinError::Envelope(r#"{"code":-1,"message":"bad tool"}"#.to_string());
        assert!(err.to_string().contains("bad tool"));
        assert_eq!(err.kind(), "envelope");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ProxyPinError = io_err.into();
        assert!(matches!(err, ProxyPinError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ProxyPinError = json_err.into();
        assert!(matches!(err, ProxyPinError::Json(_)));
    }
}
