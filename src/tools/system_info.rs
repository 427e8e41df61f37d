//! Locally answered `get_system_info` tool

use serde_json::{Value, json};

pub const GET_SYSTEM_INFO: &str = "get_system_info";

/// Capabilities listed by `get_system_info` and the startup banner
pub const FEATURES: &[&str] = &[
    "HTTP request capture and analysis",
    "Multi-criteria request search",
    "Code generation and request replay",
    "HAR import and export",
    "Request comparison",
    "API endpoint extraction",
    "Classified errors and structured logging",
    "Pooled connections with retries",
    "Concurrent tool calls",
];

/// Server metadata; never touches the network
pub fn system_info(endpoint: &str) -> Value {
    json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "upstream": endpoint,
        "features": FEATURES,
    })
}
