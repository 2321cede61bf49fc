//! CLI command implementations for Mergeboard.

pub(crate) mod inspect;
pub(crate) mod new_save;
pub(crate) mod simulate;
pub(crate) mod validate;

mod output;

use clap::ValueEnum;
use mergeboard::content::{default_catalog, default_config};
use mergeboard::game::{CatalogError, ItemCatalog};
use mergeboard::{ConfigError, GameConfig, SessionError, SnapshotError};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

/// Output format for the `simulate` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SimFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        Self::new(format!("catalog: {e}"))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::new(format!("config: {e}"))
    }
}

impl From<SnapshotError> for CliError {
    fn from(e: SnapshotError) -> Self {
        Self::new(format!("snapshot: {e}"))
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        Self::new(e.to_string())
    }
}

/// Read a catalog file.
pub(crate) fn read_catalog(path: &Path) -> Result<ItemCatalog, CliError> {
    let json = fs::read_to_string(path)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
    Ok(ItemCatalog::from_json(&json)?)
}

/// Load catalog and config from files, falling back to the built-in content.
pub(crate) fn load_content(
    catalog: Option<&Path>,
    config: Option<&Path>,
) -> Result<(ItemCatalog, GameConfig), CliError> {
    let catalog = match catalog {
        Some(path) => read_catalog(path)?,
        None => default_catalog()?,
    };
    let config = match config {
        Some(path) => GameConfig::load(path)?,
        None => default_config()?,
    };
    Ok((catalog, config))
}

/// Seed from the system clock when none is given.
pub(crate) fn seed_or_random(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u64::try_from(d.as_nanos()).ok())
            .unwrap_or(42)
    })
}
