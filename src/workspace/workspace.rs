//! Migration root and path resolution

use std::io;
use std::path::{Path, PathBuf};

/// Quarantine directory kept at the site root for archives and backups.
pub const QUARANTINE_DIR: &str = ".debedrockify";

/// The site being migrated. Every path the engine touches is resolved
/// against `root`.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at `root`, made absolute against the
    /// current directory if needed. The root does not have to exist yet.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace-relative path.
    ///
    /// Purely syntactic: leading separators and `.` components are dropped,
    /// `..` removes the previous component but never climbs above the root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        let mut components: Vec<&str> = Vec::new();
        for component in relative.split(['/', '\\']) {
            match component {
                "" | "." => continue,
                ".." => {
                    components.pop();
                }
                c => components.push(c),
            }
        }

        let mut full_path = self.root.clone();
        for component in components {
            full_path.push(component);
        }
        full_path
    }

    /// Whether `relative` exists. Never fails: anything that cannot be
    /// stat'ed counts as absent. A dangling symlink counts as present.
    pub async fn path_exists(&self, relative: &str) -> bool {
        tokio::fs::symlink_metadata(self.resolve(relative))
            .await
            .is_ok()
    }

    /// Absolute path of the quarantine directory.
    pub fn quarantine_dir(&self) -> PathBuf {
        self.resolve(QUARANTINE_DIR)
    }
}
