//! Application configuration
//!
//! Configuration is layered, later layers winning:
//! 1. Built-in defaults
//! 2. JSON config file (`tracedeck.json`, or `--config`/`TRACEDECK_CONFIG`)
//! 3. Environment variables
//! 4. CLI flags

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_BATCH_MAX_TRACES, DEFAULT_HOST, DEFAULT_METADATA_MAX_BYTES,
    DEFAULT_PORT, ENV_BATCH_MAX_TRACES, ENV_DEBUG, ENV_HOST, ENV_METADATA_MAX_BYTES, ENV_PORT,
    ENV_STORE_BACKEND,
};

/// Trace store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    #[default]
    Sqlite,
    Memory,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Trace store settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackendKind,
}

/// Ingestion pipeline settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Metadata size ceiling before the validator flags payload bloat
    pub metadata_max_bytes: usize,
    /// Maximum traces accepted per batch submission
    pub batch_max_traces: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            metadata_max_bytes: DEFAULT_METADATA_MAX_BYTES,
            batch_max_traces: DEFAULT_BATCH_MAX_TRACES,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration: defaults -> config file -> env -> CLI
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let mut config = match Self::config_file_path(cli) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        config.apply_env();
        config.apply_cli(cli);
        Ok(config)
    }

    /// Resolve the config file path: explicit CLI/env path, else CWD default
    fn config_file_path(cli: &CliConfig) -> Option<PathBuf> {
        if let Some(ref path) = cli.config {
            return Some(path.clone());
        }
        std::env::current_dir()
            .ok()
            .map(|cwd| cwd.join(CONFIG_FILE_NAME))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>(ENV_PORT) {
            self.server.port = port;
        }
        if let Ok(backend) = std::env::var(ENV_STORE_BACKEND) {
            match backend.to_lowercase().as_str() {
                "sqlite" => self.store.backend = StoreBackendKind::Sqlite,
                "memory" => self.store.backend = StoreBackendKind::Memory,
                other => tracing::warn!(backend = %other, "Unknown store backend, ignoring"),
            }
        }
        if let Some(bytes) = env_parse::<usize>(ENV_METADATA_MAX_BYTES) {
            self.ingest.metadata_max_bytes = bytes;
        }
        if let Some(max) = env_parse::<usize>(ENV_BATCH_MAX_TRACES) {
            self.ingest.batch_max_traces = max;
        }
        if let Ok(debug) = std::env::var(ENV_DEBUG) {
            self.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    fn apply_cli(&mut self, cli: &CliConfig) {
        if let Some(ref host) = cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(backend) = cli.store_backend {
            self.store.backend = backend;
        }
        if let Some(bytes) = cli.metadata_max_bytes {
            self.ingest.metadata_max_bytes = bytes;
        }
        if let Some(max) = cli.batch_max_traces {
            self.ingest.batch_max_traces = max;
        }
        if cli.debug {
            self.debug = true;
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
