//! Engine error types and the exit-code policy

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

use crate::migrate::content::ContentCategory;
use crate::workspace::env::EnvError;

/// Exit code for an operator-actionable violation.
pub const VIOLATION_EXIT: u8 = 1;
/// Exit code for any other failure.
pub const UNEXPECTED_EXIT: u8 = 127;

const MAX_NESTED_SHOWN: usize = 10;

/// Entry names shared by one category's legacy and conventional directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryConflict {
    pub category: ContentCategory,
    /// Top-level names present in both directories.
    pub names: Vec<String>,
    /// Colliding file paths below shared directories, relative to the
    /// category directory.
    pub nested: Vec<String>,
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl fmt::Display for CategoryConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} exist in both {} and {}: {}",
            self.category,
            self.source.display(),
            self.destination.display(),
            self.names.join(", ")
        )?;
        if !self.nested.is_empty() {
            let shown = self.nested.len().min(MAX_NESTED_SHOWN);
            write!(f, " (colliding files: {}", self.nested[..shown].join(", "))?;
            if self.nested.len() > shown {
                write!(f, " and {} more", self.nested.len() - shown)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A condition the operator has to fix before the migration can run.
/// Raised only before anything has been mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Precondition {
        /// Paths that must exist but do not.
        missing: Vec<String>,
        /// Paths that must not exist but do.
        unexpected: Vec<String>,
    },
    /// Every conflicting category, in migration order. Never empty.
    ContentConflict(Vec<CategoryConflict>),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Precondition {
                missing,
                unexpected,
            } => {
                write!(f, "the site does not look like an unmigrated Bedrock install")?;
                if !missing.is_empty() {
                    write!(f, "; missing: {}", missing.join(", "))?;
                }
                if !unexpected.is_empty() {
                    write!(f, "; already present: {}", unexpected.join(", "))?;
                }
                Ok(())
            }
            Violation::ContentConflict(conflicts) => {
                write!(f, "content conflicts in {} categories", conflicts.len())?;
                for conflict in conflicts {
                    write!(f, "; {}", conflict)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Violation {}

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error(transparent)]
    Violation(#[from] Violation),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),
    #[error("Dump command {command:?} not found: {reason}")]
    DumpToolMissing { command: String, reason: String },
    #[error("Database dump failed ({status}): {stderr}")]
    DumpFailed { status: ExitStatus, stderr: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid table prefix {0:?}")]
    InvalidTablePrefix(String),
    #[error("Rendered config still contains secret placeholders")]
    UnfilledSecrets,
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl MigrationError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        MigrationError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, MigrationError::Violation(_))
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        if self.is_violation() {
            VIOLATION_EXIT
        } else {
            UNEXPECTED_EXIT
        }
    }
}

/// Attach the path to an `io::Error`.
pub(crate) trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T, MigrationError>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: &Path) -> Result<T, MigrationError> {
        self.map_err(|e| MigrationError::io(path, e))
    }
}
