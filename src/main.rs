use anyhow::Context;
use clap::Parser;
use debedrockify::migrate::{MigrationError, MigrationReport, Migrator, UNEXPECTED_EXIT};
use debedrockify::workspace::{MigrationConfig, Workspace};
use std::process::ExitCode;
use tracing::{error, info};

/// Move a Bedrock site in the current directory to the conventional
/// WordPress layout
#[derive(Parser, Debug)]
#[command(name = "debedrockify")]
#[command(about)]
struct Cli {
    /// Do not copy the whole site into .debedrockify/ before migrating
    #[arg(short = 's', long)]
    skip_backup: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    debedrockify::util::init_logging();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) => {
            log_report(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = exit_code(&err);
            match err.downcast_ref::<MigrationError>() {
                Some(migration_err) if migration_err.is_violation() => {
                    error!("Migration refused: {}", migration_err);
                }
                _ => error!("Migration failed: {:#}", err),
            }
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<MigrationReport> {
    let root = std::env::current_dir().context("Failed to read current directory")?;
    let workspace = Workspace::new(&root)
        .with_context(|| format!("Failed to resolve site root {}", root.display()))?;

    let mut config = MigrationConfig::load(workspace.root())?;
    if cli.skip_backup {
        config.migration.full_backup = false;
    }

    let report = Migrator::new(workspace, config).run().await?;
    Ok(report)
}

/// The only place a failure becomes a process exit code.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<MigrationError>()
        .map_or(UNEXPECTED_EXIT, MigrationError::exit_code)
}

fn log_report(report: &MigrationReport) {
    if let Some(path) = &report.full_backup {
        info!(path = %path.display(), "Full backup");
    }
    info!(
        moved = report.moved.len(),
        archived = report.archived.len(),
        "Content relocated"
    );
    info!(path = %report.config.display(), "Config written");
    info!(path = %report.database_backup.display(), "Database backup");
    info!("Migration complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_backup_is_the_only_flag() {
        assert!(!Cli::try_parse_from(["debedrockify"]).unwrap().skip_backup);
        assert!(Cli::try_parse_from(["debedrockify", "-s"]).unwrap().skip_backup);
        assert!(Cli::try_parse_from(["debedrockify", "--skip-backup"]).unwrap().skip_backup);
        assert!(Cli::try_parse_from(["debedrockify", "--version"]).is_err());
        assert!(Cli::try_parse_from(["debedrockify", "--force"]).is_err());
    }
}
