//! Name collisions between a legacy and a conventional content directory

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use crate::migrate::content::ContentCategory;
use crate::migrate::error::{CategoryConflict, IoContext, MigrationError, Violation};
use crate::workspace::Workspace;

/// Names of the immediate children of `dir`. A missing directory is empty.
async fn entry_names(dir: &Path) -> Result<BTreeSet<OsString>, MigrationError> {
    let mut names = BTreeSet::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(MigrationError::io(dir, e)),
    };
    while let Some(entry) = entries.next_entry().await.at(dir)? {
        names.insert(entry.file_name());
    }
    Ok(names)
}

/// Top-level entry names present in both `a` and `b`. Not recursive.
pub async fn find_conflicts(a: &Path, b: &Path) -> Result<BTreeSet<OsString>, MigrationError> {
    let a_names = entry_names(a).await?;
    let b_names = entry_names(b).await?;
    Ok(a_names.intersection(&b_names).cloned().collect())
}

/// Files below shared directories that also exist at the same place in
/// `destination`, relative to the category directories.
fn nested_collisions(source: &Path, destination: &Path, shared: &BTreeSet<OsString>) -> Vec<String> {
    let mut collisions = Vec::new();
    for name in shared {
        let source_dir = source.join(name);
        if !source_dir.is_dir() || !destination.join(name).is_dir() {
            continue;
        }
        for entry in WalkDir::new(&source_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_dir() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(source) else {
                continue;
            };
            if destination.join(relative).symlink_metadata().is_ok() {
                let parts: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect();
                collisions.push(parts.join("/"));
            }
        }
    }
    collisions
}

/// Shared entry names between the category's legacy and conventional
/// directories, or `None` when they are disjoint.
pub async fn check_conflicts(
    workspace: &Workspace,
    category: ContentCategory,
) -> Result<Option<CategoryConflict>, MigrationError> {
    let source = workspace.resolve(&category.source());
    let destination = workspace.resolve(&category.destination());

    let shared = find_conflicts(&source, &destination).await?;
    if shared.is_empty() {
        return Ok(None);
    }

    let names: Vec<String> = shared
        .iter()
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    let nested = {
        let (source, destination) = (source.clone(), destination.clone());
        tokio::task::spawn_blocking(move || nested_collisions(&source, &destination, &shared))
            .await?
    };

    Ok(Some(CategoryConflict {
        category,
        names,
        nested,
        source,
        destination,
    }))
}

/// Check every category and fail with a [`Violation::ContentConflict`]
/// listing all of them. Nothing is moved here.
pub async fn check_all_conflicts(workspace: &Workspace) -> Result<(), MigrationError> {
    let mut conflicts = Vec::new();
    for category in ContentCategory::ALL {
        if let Some(conflict) = check_conflicts(workspace, category).await? {
            warn!(category = %category, names = ?conflict.names, "Content conflict");
            conflicts.push(conflict);
        }
    }

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(Violation::ContentConflict(conflicts).into())
    }
}
