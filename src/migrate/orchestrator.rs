//! The fixed migration pipeline

use std::path::PathBuf;
use tracing::info;

use crate::migrate::archive::archive_legacy_paths;
use crate::migrate::backup::backup_site;
use crate::migrate::conflicts::check_all_conflicts;
use crate::migrate::content::{migrate_content, MovedEntry};
use crate::migrate::database::{migrate_database, MySqlSite, SiteDatabase};
use crate::migrate::error::MigrationError;
use crate::migrate::preconditions::{check_presence, BEDROCK_LAYOUT};
use crate::migrate::template::write_config;
use crate::workspace::env::{DbCredentials, EnvConfig, ENV_FILE};
use crate::workspace::{MigrationConfig, Workspace};

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub full_backup: Option<PathBuf>,
    pub moved: Vec<MovedEntry>,
    pub archived: Vec<PathBuf>,
    pub config: PathBuf,
    pub database_backup: PathBuf,
}

pub struct Migrator {
    workspace: Workspace,
    config: MigrationConfig,
}

impl Migrator {
    pub fn new(workspace: Workspace, config: MigrationConfig) -> Self {
        Self { workspace, config }
    }

    /// Run against the MySQL database named in `.env`.
    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        let dump = &self.config.database;
        self.run_with(|credentials, env: &EnvConfig| {
            MySqlSite::new(credentials, env.table_prefix(), dump)
        })
        .await
    }

    /// Run the pipeline, opening the site database with `open`.
    ///
    /// Phases run strictly in order and the first failure stops the run.
    /// Everything up to the conflict checks leaves the site untouched apart
    /// from the optional full backup; nothing is rolled back after that.
    pub async fn run_with<D, F>(&self, open: F) -> Result<MigrationReport, MigrationError>
    where
        D: SiteDatabase,
        F: FnOnce(DbCredentials, &EnvConfig) -> Result<D, MigrationError>,
    {
        let ws = &self.workspace;
        info!(root = %ws.root().display(), "Checking site layout");
        check_presence(ws, BEDROCK_LAYOUT).await?;

        let env = EnvConfig::load(&ws.resolve(ENV_FILE))?;
        let credentials = env.db_credentials()?;
        let database_name = credentials.name.clone();
        let site_url = env.site_url()?.to_string();
        let database = open(credentials, &env)?;
        database.preflight().await?;

        let full_backup = if self.config.migration.full_backup {
            Some(backup_site(ws).await?)
        } else {
            info!("Full backup disabled, skipping");
            None
        };

        check_all_conflicts(ws).await?;
        let moved = migrate_content(ws).await?;
        info!(entries = moved.len(), "Content migrated");

        let archived = if self.config.migration.archive_legacy_paths {
            archive_legacy_paths(ws).await?
        } else {
            Vec::new()
        };

        let config = write_config(ws, &env).await?;
        let database_backup = migrate_database(ws, &database, &database_name, &site_url).await?;

        Ok(MigrationReport {
            full_backup,
            moved,
            archived,
            config,
            database_backup,
        })
    }
}
