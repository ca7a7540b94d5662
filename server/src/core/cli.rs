use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::StoreBackendKind;
use super::constants::{
    ENV_BATCH_MAX_TRACES, ENV_CONFIG, ENV_DEBUG, ENV_HOST, ENV_METADATA_MAX_BYTES, ENV_PORT,
    ENV_STORE_BACKEND,
};

#[derive(Parser)]
#[command(name = "tracedeck")]
#[command(version, about = "Real-time LLM trace debugging server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug mode (verbose ingestion logging)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Trace store backend (sqlite or memory)
    #[arg(long, global = true, env = ENV_STORE_BACKEND, value_parser = parse_store_backend)]
    pub store_backend: Option<StoreBackendKind>,

    /// Metadata size ceiling in bytes before the validator flags payload bloat
    #[arg(long, global = true, env = ENV_METADATA_MAX_BYTES)]
    pub metadata_max_bytes: Option<usize>,

    /// Maximum traces accepted per batch submission
    #[arg(long, global = true, env = ENV_BATCH_MAX_TRACES)]
    pub batch_max_traces: Option<usize>,
}

/// Parse store backend from CLI/env string
fn parse_store_backend(s: &str) -> Result<StoreBackendKind, String> {
    match s.to_lowercase().as_str() {
        "sqlite" => Ok(StoreBackendKind::Sqlite),
        "memory" => Ok(StoreBackendKind::Memory),
        _ => Err(format!(
            "Invalid store backend '{}'. Valid options: sqlite, memory",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// System maintenance commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum SystemCommands {
    /// Delete local data directory (database). Requires confirmation.
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub store_backend: Option<StoreBackendKind>,
    pub metadata_max_bytes: Option<usize>,
    pub batch_max_traces: Option<usize>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        debug: cli.debug,
        config: cli.config,
        store_backend: cli.store_backend,
        metadata_max_bytes: cli.metadata_max_bytes,
        batch_max_traces: cli.batch_max_traces,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store_backend_valid() {
        assert!(matches!(
            parse_store_backend("sqlite"),
            Ok(StoreBackendKind::Sqlite)
        ));
        assert!(matches!(
            parse_store_backend("MEMORY"),
            Ok(StoreBackendKind::Memory)
        ));
    }

    #[test]
    fn test_parse_store_backend_invalid() {
        assert!(parse_store_backend("duckdb").is_err());
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
