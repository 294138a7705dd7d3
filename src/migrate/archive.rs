//! Quarantine for retired Bedrock paths

use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::migrate::error::{IoContext, MigrationError};
use crate::workspace::Workspace;

/// Subdirectory of the quarantine holding archived paths.
pub const ARCHIVE_DIR: &str = "old";

/// Bedrock paths with no role after the migration: the legacy content root
/// and the front controller files that pointed WordPress at it.
pub const LEGACY_PATHS: &[&str] = &["web/app", "web/index.php", "web/wp-config.php"];

/// Move `relative` to `.debedrockify/old/<relative>`.
///
/// Returns `None` without touching the filesystem when the path does not
/// exist. An occupied quarantine slot is an error; nothing is overwritten.
pub async fn archive(
    workspace: &Workspace,
    relative: &str,
) -> Result<Option<PathBuf>, MigrationError> {
    if !workspace.path_exists(relative).await {
        debug!(path = relative, "Nothing to archive");
        return Ok(None);
    }

    let from = workspace.resolve(relative);
    let key = from
        .strip_prefix(workspace.root())
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    let to = workspace.quarantine_dir().join(ARCHIVE_DIR).join(key);

    if tokio::fs::symlink_metadata(&to).await.is_ok() {
        return Err(MigrationError::io(
            &to,
            std::io::Error::new(ErrorKind::AlreadyExists, "archive destination already exists"),
        ));
    }
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await.at(parent)?;
    }
    tokio::fs::rename(&from, &to).await.at(&from)?;

    info!(from = %from.display(), to = %to.display(), "Archived");
    Ok(Some(to))
}

/// Archive every path in [`LEGACY_PATHS`] that is still present.
pub async fn archive_legacy_paths(workspace: &Workspace) -> Result<Vec<PathBuf>, MigrationError> {
    let mut archived = Vec::new();
    for path in LEGACY_PATHS {
        if let Some(to) = archive(workspace, path).await? {
            archived.push(to);
        }
    }
    Ok(archived)
}
