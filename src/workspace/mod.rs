//! The site being migrated
//!
//! This module provides:
//! - Path resolution against the site root
//! - Tool configuration (.debedrockify.toml)
//! - Bedrock `.env` loading

pub mod config;
pub mod env;
pub mod workspace;

pub use config::MigrationConfig;
pub use env::{DbCredentials, EnvConfig};
pub use workspace::{Workspace, QUARANTINE_DIR};
