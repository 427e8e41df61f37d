//! proxypin-mcp - ProxyPin tools over the Model Context Protocol
//!
//! Every tool call is wrapped in a `tools/call` envelope, posted to ProxyPin's
//! local `/messages` endpoint, and the nested response is unwrapped into the
//! tool's JSON payload.

pub mod config;
pub mod envelope;
pub mod error;
pub mod forwarder;
pub mod id;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{ProxyPinError, Result};
pub use forwarder::ToolForwarder;
