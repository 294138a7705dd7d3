//! Pre-migration layout check

use tracing::debug;

use crate::migrate::error::Violation;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    MustExist,
    MustNotExist,
}

/// A workspace-relative path and whether it must be there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedPath {
    pub path: &'static str,
    pub presence: Presence,
}

impl ExpectedPath {
    pub const fn present(path: &'static str) -> Self {
        Self {
            path,
            presence: Presence::MustExist,
        }
    }

    pub const fn absent(path: &'static str) -> Self {
        Self {
            path,
            presence: Presence::MustNotExist,
        }
    }
}

/// Shape of an unmigrated Bedrock site.
pub const BEDROCK_LAYOUT: &[ExpectedPath] = &[
    ExpectedPath::present(".env"),
    ExpectedPath::present("web/app"),
    ExpectedPath::present("web/wp"),
    ExpectedPath::present("web/wp/wp-config-sample.php"),
    ExpectedPath::absent("web/wp/wp-config.php"),
];

/// Probe every expected path and report all mismatches at once.
pub async fn check_presence(
    workspace: &Workspace,
    expected: &[ExpectedPath],
) -> Result<(), Violation> {
    let mut missing = Vec::new();
    let mut unexpected = Vec::new();

    for entry in expected {
        let exists = workspace.path_exists(entry.path).await;
        debug!(path = entry.path, exists, "Checked path");
        match (entry.presence, exists) {
            (Presence::MustExist, false) => missing.push(entry.path.to_string()),
            (Presence::MustNotExist, true) => unexpected.push(entry.path.to_string()),
            _ => {}
        }
    }

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(Violation::Precondition {
            missing,
            unexpected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn bedrock_site() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join(".env"), "DB_NAME=wp\n").unwrap();
        fs::create_dir_all(root.join("web/app")).unwrap();
        fs::create_dir_all(root.join("web/wp")).unwrap();
        fs::write(root.join("web/wp/wp-config-sample.php"), "<?php\n").unwrap();
        temp
    }

    #[tokio::test]
    async fn test_bedrock_layout_passes() {
        let temp = bedrock_site();
        let ws = Workspace::new(temp.path()).unwrap();
        assert!(check_presence(&ws, BEDROCK_LAYOUT).await.is_ok());
    }

    #[tokio::test]
    async fn test_existing_config_is_unexpected() {
        let temp = bedrock_site();
        fs::write(temp.path().join("web/wp/wp-config.php"), "<?php\n").unwrap();
        let ws = Workspace::new(temp.path()).unwrap();

        let violation = check_presence(&ws, BEDROCK_LAYOUT).await.unwrap_err();
        assert_eq!(
            violation,
            Violation::Precondition {
                missing: vec![],
                unexpected: vec!["web/wp/wp-config.php".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_reports_all_violations() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("web/wp")).unwrap();
        fs::write(temp.path().join("web/wp/wp-config.php"), "<?php\n").unwrap();
        let ws = Workspace::new(temp.path()).unwrap();

        match check_presence(&ws, BEDROCK_LAYOUT).await {
            Err(Violation::Precondition {
                missing,
                unexpected,
            }) => {
                assert_eq!(missing, vec![".env", "web/app", "web/wp/wp-config-sample.php"]);
                assert_eq!(unexpected, vec!["web/wp/wp-config.php"]);
            }
            other => panic!("expected precondition violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_expectation_set() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path()).unwrap();
        assert!(check_presence(&ws, &[]).await.is_ok());
    }
}
