//! MCP Layer - the inbound side clients invoke tools through
//!
//! This module provides:
//! - JSON-RPC message types and error codes
//! - The stdio server routing initialize, tools/list and tools/call

pub mod messages;
pub mod server;

pub use messages::{CallToolParams, ErrorCode, McpError, McpRequest, McpResponse, Methods, PROTOCOL_VERSION};
pub use server::McpServer;
