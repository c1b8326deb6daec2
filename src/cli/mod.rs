pub mod check;
pub mod commands;
pub mod health;
pub mod history;
pub mod output;
pub mod score;
pub mod whitelist;

pub use commands::{Cli, Commands};

use std::path::{Path, PathBuf};
use phishguard::config::{self, GuardConfig};
use phishguard::db::Database;
use phishguard::errors::GuardError;
use tracing::debug;

/// Picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "phishguard.yaml";

pub fn build_info() -> String {
    format!(
        "phishguard {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").unwrap_or("dev"),
        option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
    )
}

pub async fn load_config(path: Option<&str>) -> Result<GuardConfig, GuardError> {
    match path {
        Some(p) => config::parse_config(&PathBuf::from(p)).await,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            debug!(path = DEFAULT_CONFIG_FILE, "Using configuration from working directory");
            config::parse_config(Path::new(DEFAULT_CONFIG_FILE)).await
        }
        None => Ok(GuardConfig::default()),
    }
}

pub fn open_database(config: &GuardConfig) -> Result<Database, GuardError> {
    Database::new(&config.storage.database, config.storage.max_pages)
}
