//! Migration engine: Bedrock layout to conventional WordPress layout
//!
//! Phases, in order:
//! - Precondition check of the site layout
//! - Optional full copy of the site into the quarantine directory
//! - Conflict check for every content category
//! - Content moves from `web/app` into `web/wp/wp-content`
//! - Optional archival of retired Bedrock paths
//! - `wp-config.php` rendering
//! - Database dump and site URL rewrite

pub mod archive;
pub mod backup;
pub mod conflicts;
pub mod content;
pub mod database;
pub mod error;
pub mod orchestrator;
pub mod preconditions;
pub mod template;

pub use content::{ContentCategory, MovedEntry};
pub use database::{MySqlSite, SiteDatabase};
pub use error::{CategoryConflict, MigrationError, Violation, UNEXPECTED_EXIT, VIOLATION_EXIT};
pub use orchestrator::{MigrationReport, Migrator};
