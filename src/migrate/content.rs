//! Relocation of Bedrock content folders into wp-content

use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::migrate::error::{IoContext, MigrationError};
use crate::workspace::Workspace;

/// Bedrock's content directory.
pub const LEGACY_CONTENT_ROOT: &str = "web/app";
/// Where WordPress expects content.
pub const CONTENT_ROOT: &str = "web/wp/wp-content";

/// A kind of content folder migrated on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Languages,
    MuPlugins,
    Plugins,
    Themes,
    Uploads,
    Upgrade,
}

impl ContentCategory {
    /// Every category, in migration order.
    pub const ALL: [ContentCategory; 6] = [
        ContentCategory::Languages,
        ContentCategory::MuPlugins,
        ContentCategory::Plugins,
        ContentCategory::Themes,
        ContentCategory::Uploads,
        ContentCategory::Upgrade,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            ContentCategory::Languages => "languages",
            ContentCategory::MuPlugins => "mu-plugins",
            ContentCategory::Plugins => "plugins",
            ContentCategory::Themes => "themes",
            ContentCategory::Uploads => "uploads",
            ContentCategory::Upgrade => "upgrade",
        }
    }

    /// Workspace-relative legacy directory, e.g. `web/app/themes`.
    pub fn source(self) -> String {
        format!("{}/{}", LEGACY_CONTENT_ROOT, self.dir_name())
    }

    /// Workspace-relative conventional directory, e.g. `web/wp/wp-content/themes`.
    pub fn destination(self) -> String {
        format!("{}/{}", CONTENT_ROOT, self.dir_name())
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One entry moved from a legacy directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedEntry {
    pub category: ContentCategory,
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Move every immediate child of the category's legacy directory into its
/// conventional directory. A missing legacy directory is skipped.
///
/// Moves are not transactional: on failure, entries moved so far stay moved.
pub async fn migrate_category(
    workspace: &Workspace,
    category: ContentCategory,
) -> Result<Vec<MovedEntry>, MigrationError> {
    let source_rel = category.source();
    if !workspace.path_exists(&source_rel).await {
        debug!(category = %category, "No legacy directory, skipping");
        return Ok(Vec::new());
    }

    let source = workspace.resolve(&source_rel);
    let destination = workspace.resolve(&category.destination());
    tokio::fs::create_dir_all(&destination).await.at(&destination)?;

    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(&source).await.at(&source)?;
    while let Some(entry) = entries.next_entry().await.at(&source)? {
        names.push(entry.file_name());
    }
    names.sort();

    let mut moved = Vec::with_capacity(names.len());
    for name in names {
        let from = source.join(&name);
        let to = destination.join(&name);
        tokio::fs::rename(&from, &to).await.at(&from)?;
        info!(category = %category, from = %from.display(), to = %to.display(), "Moved");
        moved.push(MovedEntry { category, from, to });
    }

    Ok(moved)
}

/// Migrate all categories in order.
pub async fn migrate_content(workspace: &Workspace) -> Result<Vec<MovedEntry>, MigrationError> {
    let mut moved = Vec::new();
    for category in ContentCategory::ALL {
        moved.extend(migrate_category(workspace, category).await?);
    }
    Ok(moved)
}
