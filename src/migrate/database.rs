//! Database dump and site URL rewrite

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::migrate::backup::timestamp;
use crate::migrate::error::{IoContext, MigrationError};
use crate::workspace::config::DatabaseSection;
use crate::workspace::env::DbCredentials;
use crate::workspace::Workspace;

/// Option rows holding the site's canonical and home URLs.
pub const SITE_URL_OPTIONS: [&str; 2] = ["siteurl", "home"];

const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// The site database as seen by the migration: it can be dumped to a file
/// and have its site URL rewritten.
#[async_trait]
pub trait SiteDatabase: Send + Sync {
    /// Check that a backup can be taken, before anything is mutated.
    async fn preflight(&self) -> Result<(), MigrationError>;

    /// Write a full SQL dump to `destination`.
    async fn backup(&self, destination: &Path) -> Result<(), MigrationError>;

    /// Point `siteurl` and `home` at `site_url`.
    async fn rewrite_site_url(&self, site_url: &str) -> Result<(), MigrationError>;
}

/// A MySQL/MariaDB site database, dumped with an external command and
/// rewritten over one sqlx connection.
pub struct MySqlSite {
    credentials: DbCredentials,
    table_prefix: String,
    dump_command: String,
    dump_args: Vec<String>,
}

impl MySqlSite {
    pub fn new(
        credentials: DbCredentials,
        table_prefix: Option<&str>,
        dump: &DatabaseSection,
    ) -> Result<Self, MigrationError> {
        let table_prefix = table_prefix.unwrap_or(DEFAULT_TABLE_PREFIX).to_string();
        validate_table_prefix(&table_prefix)?;
        Ok(Self {
            credentials,
            table_prefix,
            dump_command: dump.dump_command.clone(),
            dump_args: dump.dump_args.clone(),
        })
    }

    fn options_table(&self) -> String {
        format!("{}options", self.table_prefix)
    }

    fn dump_arguments(&self) -> Vec<String> {
        let creds = &self.credentials;
        let mut args = vec![
            format!("--user={}", creds.user),
            format!("--password={}", creds.password),
            format!("--host={}", creds.host),
        ];
        match &creds.socket {
            Some(socket) => args.push(format!("--socket={}", socket)),
            None => args.push(format!("--port={}", creds.port)),
        }
        args.extend(self.dump_args.iter().cloned());
        args.push(creds.name.clone());
        args
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let creds = &self.credentials;
        let options = MySqlConnectOptions::new()
            .host(&creds.host)
            .port(creds.port)
            .username(&creds.user)
            .password(&creds.password)
            .database(&creds.name);
        match &creds.socket {
            Some(socket) => options.socket(socket),
            None => options,
        }
    }
}

/// Table prefixes are spliced into SQL, so only identifier characters pass.
fn validate_table_prefix(prefix: &str) -> Result<(), MigrationError> {
    if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(MigrationError::InvalidTablePrefix(prefix.to_string()))
    }
}

/// DELETE and INSERT statements for the site URL rows of `table`.
fn site_url_statements(table: &str) -> (String, String) {
    let placeholders = vec!["?"; SITE_URL_OPTIONS.len()].join(", ");
    let delete = format!("DELETE FROM `{}` WHERE option_name IN ({})", table, placeholders);
    // 'yes' is autoloaded by every WordPress release, including 6.6+.
    let insert = format!(
        "INSERT INTO `{}` (option_name, option_value, autoload) VALUES (?, ?, 'yes')",
        table
    );
    (delete, insert)
}

/// An open connection to the site database.
#[async_trait]
trait OptionsConnection: Send + Sized {
    /// Replace the site URL rows in one transaction. Returns the number of
    /// rows deleted.
    async fn replace_site_url(&mut self, table: &str, site_url: &str) -> Result<u64, sqlx::Error>;

    async fn close(self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl OptionsConnection for MySqlConnection {
    async fn replace_site_url(&mut self, table: &str, site_url: &str) -> Result<u64, sqlx::Error> {
        let (delete, insert) = site_url_statements(table);
        let mut tx = self.begin().await?;

        let mut query = sqlx::query(&delete);
        for option in SITE_URL_OPTIONS {
            query = query.bind(option);
        }
        let deleted = query.execute(&mut *tx).await?.rows_affected();

        for option in SITE_URL_OPTIONS {
            sqlx::query(&insert)
                .bind(option)
                .bind(site_url)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }

    async fn close(self) -> Result<(), sqlx::Error> {
        Connection::close(self).await
    }
}

/// Rewrite the site URL over `conn`, then close it whether or not the
/// rewrite went through.
async fn rewrite_and_close<C: OptionsConnection>(
    mut conn: C,
    table: &str,
    site_url: &str,
) -> Result<(), MigrationError> {
    let result = conn.replace_site_url(table, site_url).await;

    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close database connection");
    }

    let deleted = result?;
    info!(table, deleted, site_url, "Rewrote site URL options");
    Ok(())
}

#[async_trait]
impl SiteDatabase for MySqlSite {
    async fn preflight(&self) -> Result<(), MigrationError> {
        which::which(&self.dump_command).map_err(|e| MigrationError::DumpToolMissing {
            command: self.dump_command.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn backup(&self, destination: &Path) -> Result<(), MigrationError> {
        let mut child = Command::new(&self.dump_command)
            .args(self.dump_arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MigrationError::io(Path::new(&self.dump_command), e))?;

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            return Err(MigrationError::io(
                Path::new(&self.dump_command),
                std::io::Error::other("dump command pipes unavailable"),
            ));
        };

        let mut file = tokio::fs::File::create(destination).await.at(destination)?;
        let mut errors = Vec::new();
        let (copied, _) = tokio::try_join!(
            tokio::io::copy(&mut stdout, &mut file),
            stderr.read_to_end(&mut errors),
        )
        .at(destination)?;
        file.sync_all().await.at(destination)?;

        let status = child
            .wait()
            .await
            .map_err(|e| MigrationError::io(Path::new(&self.dump_command), e))?;
        if !status.success() {
            return Err(MigrationError::DumpFailed {
                status,
                stderr: String::from_utf8_lossy(&errors).trim().to_string(),
            });
        }

        info!(path = %destination.display(), bytes = copied, "Database dumped");
        Ok(())
    }

    async fn rewrite_site_url(&self, site_url: &str) -> Result<(), MigrationError> {
        let conn = MySqlConnection::connect_with(&self.connect_options()).await?;
        rewrite_and_close(conn, &self.options_table(), site_url).await
    }
}

/// Dump the database into the quarantine directory, then rewrite the site
/// URL. The rewrite never runs unless the dump succeeded.
pub async fn migrate_database(
    workspace: &Workspace,
    database: &dyn SiteDatabase,
    database_name: &str,
    site_url: &str,
) -> Result<PathBuf, MigrationError> {
    let quarantine = workspace.quarantine_dir();
    tokio::fs::create_dir_all(&quarantine).await.at(&quarantine)?;

    let dump = quarantine.join(format!("{}-{}.sql", database_name, timestamp()));
    database.backup(&dump).await?;
    database.rewrite_site_url(site_url).await?;
    Ok(dump)
}
