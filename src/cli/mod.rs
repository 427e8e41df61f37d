//! CLI module for proxypin-mcp - command-line interface and subcommands.
//!
//! Serving MCP over stdio is the default; `call` and `tools` exist for
//! poking at a ProxyPin instance by hand.

pub mod commands;

pub use commands::Cli;
