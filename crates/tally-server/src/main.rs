//! Tally server entry point.
//!
//! Opens the store (which applies migrations), seeds the built-in roles and
//! runs the audit retention sweep until interrupted.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tally_audit::AuditLogService;
use tally_authz::RoleService;
use tally_core::error::TallyResult;
use tally_db::repository::{
    SurrealAuditLogRepository, SurrealPermissionRepository, SurrealRoleRepository,
};
use tally_db::DbManager;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "tally-server", version, about = "Tally audit and authorization service")]
struct Args {
    /// TOML configuration file. Falls back to `./tally.toml` when present.
    #[arg(long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tally=info")),
        )
        .json()
        .init();

    info!("Starting Tally server...");

    match run(args).await {
        Ok(()) => {
            info!("Tally server stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Tally server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> TallyResult<()> {
    let config = ServerConfig::load(args.config.as_deref())?;

    let manager = DbManager::connect(&config.db).await?;
    let db = manager.client();

    if config.seed_defaults {
        RoleService::new(
            SurrealRoleRepository::new(db.clone()),
            SurrealPermissionRepository::new(db.clone()),
        )
        .seed_defaults()
        .await?;
    }

    let audit = AuditLogService::with_config(
        SurrealAuditLogRepository::new(db.clone()),
        config.audit.clone(),
    );
    let retention_days = audit.config().retention_days;
    let every = Duration::from_secs(config.retention_interval_hours.max(1) * 3600);

    info!(retention_days, interval = ?every, "Audit retention sweep scheduled");

    // The first tick fires immediately.
    let mut sweep = tokio::time::interval(every);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                if let Err(e) = audit.cleanup_old_logs(retention_days).await {
                    warn!(error = %e, "Audit retention sweep failed");
                }
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutdown requested");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_flag_is_parsed() {
        let args = Args::try_parse_from(["tally-server", "--config", "/etc/tally.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/tally.toml")));

        let args = Args::try_parse_from(["tally-server", "--config=local.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("local.toml")));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["tally-server", "--verbose"]).is_err());
    }

    #[test]
    fn args_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
