use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::{ProxyPinError, Result};

/// Environment variable overriding the upstream host
pub const HOST_ENV: &str = "PROXYPIN_HOST";

/// Environment variable overriding the upstream port
pub const PORT_ENV: &str = "PROXYPIN_PORT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub upstream: UpstreamConfig,
    pub transport: TransportConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: 17777,
        }
    }
}

impl UpstreamConfig {
    /// `{scheme}://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Endpoint every tool call is posted to
    pub fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub timeout_ms: u64,
    /// Idle connections kept per host
    pub pool_size: usize,
    /// Upper bound on in-flight requests; excess callers queue
    pub max_connections: usize,
    pub retry_statuses: Vec<u16>,
    /// Retry 5xx and timeouts for tools that change upstream state
    pub retry_mutating_calls: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 0.3,
            timeout_ms: 30000,
            pool_size: 10,
            max_connections: 20,
            retry_statuses: vec![429, 500, 502, 503, 504],
            retry_mutating_calls: false,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub banner: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "ProxyPin-MCP-Server".to_string(),
            banner: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            upstream: UpstreamConfig::default(),
            transport: TransportConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            ProxyPinError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config
            .validate()
            .map_err(|e| ProxyPinError::Config(format!("{}: {}", path.display(), e)))?;

        log::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Reject values that would only fail later, mid-call
    pub fn validate(&self) -> Result<()> {
        let factor = self.transport.backoff_factor;
        if !factor.is_finite() || factor < 0.0 {
            return Err(ProxyPinError::Config(format!(
                "transport.backoff_factor must be a finite number >= 0, got {}",
                factor
            )));
        }
        self.log_level_filter()?;
        Ok(())
    }

    /// Parsed `log_level`; `None` when unset
    pub fn log_level_filter(&self) -> Result<Option<LevelFilter>> {
        self.log_level
            .as_deref()
            .map(|level| {
                level
                    .trim()
                    .parse::<LevelFilter>()
                    .map_err(|_| ProxyPinError::Config(format!("unknown log_level: {:?}", level)))
            })
            .transpose()
    }

    /// Override upstream host/port from `PROXYPIN_HOST` / `PROXYPIN_PORT`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV).filter(|h| !h.trim().is_empty()) {
            self.upstream.host = host.trim().to_string();
        }
        if let Some(port) = lookup(PORT_ENV).filter(|p| !p.trim().is_empty()) {
            self.upstream.port = port
                .trim()
                .parse()
                .map_err(|_| ProxyPinError::Config(format!("{} is not a valid port: {:?}", PORT_ENV, port)))?;
        }
        Ok(())
    }
}
