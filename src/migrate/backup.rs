//! Full copy of the site taken before anything is moved

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::migrate::error::{IoContext, MigrationError};
use crate::workspace::{Workspace, QUARANTINE_DIR};

/// Local time stamp used in backup names, e.g. `20240131-174502`.
pub(crate) fn timestamp() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Copy the whole site into `.debedrockify/backup-<stamp>/`, leaving out
/// the quarantine directory itself.
pub async fn backup_site(workspace: &Workspace) -> Result<PathBuf, MigrationError> {
    let root = workspace.root().to_path_buf();
    let destination = workspace
        .quarantine_dir()
        .join(format!("backup-{}", timestamp()));

    let files = {
        let destination = destination.clone();
        tokio::task::spawn_blocking(move || copy_tree(&root, &destination)).await??
    };

    info!(path = %destination.display(), files, "Site backed up");
    Ok(destination)
}

fn copy_tree(root: &Path, destination: &Path) -> Result<u64, MigrationError> {
    fs::create_dir_all(destination).at(destination)?;

    let mut files = 0;
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == QUARANTINE_DIR));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            MigrationError::io(&path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).at(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            files += 1;
        } else {
            fs::copy(entry.path(), &target).at(entry.path())?;
            files += 1;
        }
    }

    Ok(files)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<(), MigrationError> {
    let pointee = fs::read_link(link).at(link)?;
    std::os::unix::fs::symlink(pointee, target).at(target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<(), MigrationError> {
    fs::copy(link, target).at(link).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_backup_copies_site_without_quarantine() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join(".env"), "DB_NAME=wp\n").unwrap();
        fs::create_dir_all(root.join("web/app/themes/mytheme")).unwrap();
        fs::write(root.join("web/app/themes/mytheme/style.css"), "body{}").unwrap();
        fs::create_dir_all(root.join("web/app/uploads")).unwrap();
        fs::create_dir_all(root.join(".debedrockify/old")).unwrap();

        let ws = Workspace::new(root).unwrap();
        let backup = backup_site(&ws).await.unwrap();

        assert!(backup.starts_with(root.join(".debedrockify")));
        assert_eq!(fs::read_to_string(backup.join(".env")).unwrap(), "DB_NAME=wp\n");
        assert_eq!(
            fs::read_to_string(backup.join("web/app/themes/mytheme/style.css")).unwrap(),
            "body{}"
        );
        assert!(backup.join("web/app/uploads").is_dir());
        assert!(!backup.join(".debedrockify").exists());
        // The original stays in place.
        assert!(root.join("web/app/themes/mytheme/style.css").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_backup_keeps_symlinks() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("web")).unwrap();
        std::os::unix::fs::symlink("../shared/uploads", root.join("web/uploads")).unwrap();

        let ws = Workspace::new(root).unwrap();
        let backup = backup_site(&ws).await.unwrap();

        assert_eq!(
            fs::read_link(backup.join("web/uploads")).unwrap(),
            PathBuf::from("../shared/uploads")
        );
    }
}
