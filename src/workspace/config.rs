//! Migration configuration parsing (.debedrockify.toml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE: &str = ".debedrockify.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Migration configuration from .debedrockify.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigrationConfig {
    #[serde(default)]
    pub migration: MigrationSection,
    #[serde(default)]
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSection {
    /// Copy the whole site into the quarantine directory before moving anything.
    #[serde(default = "default_true")]
    pub full_backup: bool,
    /// Move retired Bedrock paths into the quarantine directory.
    #[serde(default = "default_true")]
    pub archive_legacy_paths: bool,
}

impl Default for MigrationSection {
    fn default() -> Self {
        Self {
            full_backup: true,
            archive_legacy_paths: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_dump_command")]
    pub dump_command: String,
    /// Extra arguments passed to the dump command before the database name.
    #[serde(default)]
    pub dump_args: Vec<String>,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            dump_command: default_dump_command(),
            dump_args: Vec::new(),
        }
    }
}

fn default_dump_command() -> String {
    "mysqldump".to_string()
}

impl MigrationConfig {
    /// Load config from the site root. A missing file yields the defaults.
    pub fn load(site_root: &Path) -> Result<Self, ConfigError> {
        let config_path = site_root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
