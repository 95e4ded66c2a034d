use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub submit: SubmitConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Location of the SQLite pattern store.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("patterns.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmitConfig {
    /// Origin stamped on generated incidents when the matched node carries
    /// no origin of its own.
    #[serde(default = "default_origin")]
    pub origin: String,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
        }
    }
}

fn default_origin() -> String {
    "maestro".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LookupConfig {
    /// External query tool invoked to resolve a test or build id into a
    /// full report in by-id mode.
    #[serde(default = "default_lookup_command")]
    pub command: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            command: default_lookup_command(),
        }
    }
}

fn default_lookup_command() -> String {
    "kcidb-query".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.submit.origin.is_empty() {
        anyhow::bail!("submit.origin must not be empty");
    }

    if config.lookup.command.is_empty() {
        anyhow::bail!("lookup.command must not be empty");
    }

    Ok(config)
}
