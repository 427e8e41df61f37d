//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - serve: run the MCP server on stdio (default)
//! - call: invoke a single tool and print its result
//! - tools: list the tool catalog

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ProxyPin MCP server - exposes ProxyPin's capture API as MCP tools
#[derive(Parser, Debug)]
#[command(name = "proxypin-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// ProxyPin host (overrides config and PROXYPIN_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// ProxyPin port (overrides config and PROXYPIN_PORT)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Serve MCP over stdin/stdout
    Serve {
        /// Suppress the startup banner on stderr
        #[arg(long)]
        no_banner: bool,
    },

    /// Invoke one tool and print the decoded result
    Call {
        /// Tool name, e.g. search_requests
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
    },

    /// List available tools
    Tools {
        /// Include parameter schemas
        #[arg(short, long)]
        detailed: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve { no_banner: false }
    }
}
