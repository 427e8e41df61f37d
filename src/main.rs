use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::{LevelFilter, info};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use proxypin_mcp::mcp::McpServer;
use proxypin_mcp::tools::{self, FEATURES, ToolCatalog};
use proxypin_mcp::transport::HttpTransport;
use proxypin_mcp::{Config, ToolForwarder};

fn setup_logging(verbose: bool) -> Result<PathBuf> {
    // Stdout carries MCP frames, so logs always go to a file
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("proxypin-mcp")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("proxypin_mcp.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // Without RUST_LOG, log::max_level is the only filter; config narrows it later
    let mut builder = env_logger::Builder::from_default_env();
    if !rust_log_set() {
        builder.filter_level(LevelFilter::Trace);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    if !rust_log_set() {
        log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
    }

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(log_file)
}

fn rust_log_set() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}

fn apply_log_level(config: &Config, verbose: bool) -> Result<()> {
    if verbose || rust_log_set() {
        return Ok(());
    }
    if let Some(level) = config.log_level_filter()? {
        log::set_max_level(level);
        info!("Log level set to {} from config", level);
    }
    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(host) = &cli.host {
        config.upstream.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.upstream.port = port;
    }
}

fn build_forwarder(config: &Config) -> Result<(Arc<HttpTransport>, Arc<ToolForwarder>)> {
    let transport = Arc::new(
        HttpTransport::new(&config.upstream, &config.transport).context("Failed to build HTTP transport")?,
    );
    let forwarder = Arc::new(ToolForwarder::new(transport.clone()));
    Ok((transport, forwarder))
}

fn print_banner(config: &Config, log_file: &std::path::Path) {
    eprintln!("{}", "=".repeat(60).dimmed());
    eprintln!("{} v{}", config.server.name.bold().cyan(), env!("CARGO_PKG_VERSION"));
    eprintln!("{} {}", "ProxyPin:".green(), config.upstream.base_url());
    eprintln!("{} {}", "Logs:".green(), log_file.display());
    eprintln!("{}", "Features:".green());
    for feature in FEATURES {
        eprintln!("  - {}", feature);
    }
    eprintln!("{}", "=".repeat(60).dimmed());
}

async fn run_serve(config: &Config, log_file: &std::path::Path, no_banner: bool) -> Result<()> {
    if config.server.banner && !no_banner {
        print_banner(config, log_file);
    }

    let (transport, forwarder) = build_forwarder(config)?;
    info!(
        "Starting {} against {}",
        config.server.name,
        transport.messages_url()
    );

    let server = Arc::new(McpServer::new(forwarder, config.server.name.clone()));
    let result = server.serve_stdio().await;
    transport.close();
    result.context("MCP server failed")
}

async fn run_call(config: &Config, tool: &str, args: Option<&str>) -> Result<()> {
    let arguments: Value = match args {
        Some(raw) => serde_json::from_str(raw).context("--args must be a JSON object")?,
        None => Value::Null,
    };
    if !(arguments.is_null() || arguments.is_object()) {
        return Err(eyre!("--args must be a JSON object"));
    }

    let (transport, forwarder) = build_forwarder(config)?;
    let result = tools::dispatch(&forwarder, tool, arguments).await;
    transport.close();

    let value = result.with_context(|| format!("Tool '{}' failed", tool))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn run_tools(detailed: bool) -> Result<()> {
    let catalog = ToolCatalog::new();
    for tool in catalog.all() {
        let marker = if tool.mutating { "*".yellow() } else { " ".normal() };
        println!("{}{} - {}", marker, tool.name.bold(), tool.description);
        if detailed {
            println!("{}", serde_json::to_string_pretty(&tool.input_schema)?);
        }
    }
    println!("\n{} tools ({} changes ProxyPin state)", catalog.len(), "*".yellow());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging first
    let log_file = setup_logging(cli.is_verbose()).context("Failed to setup logging")?;

    // Load configuration
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    apply_overrides(&cli, &mut config);
    apply_log_level(&config, cli.is_verbose())?;

    info!("Starting with config from: {:?}", cli.config);

    match cli.command.clone().unwrap_or_default() {
        Commands::Serve { no_banner } => run_serve(&config, &log_file, no_banner).await,
        Commands::Call { tool, args } => run_call(&config, &tool, args.as_deref()).await,
        Commands::Tools { detailed } => run_tools(detailed),
    }
}
