//! Membersync CLI - Command-line interface for membersync
//!
//! Provides commands for:
//! - Running a reconciliation (`sync`)
//! - Viewing tracked-record status (`status`)
//! - Inspecting the run audit trail (`runs`)

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod source;

use commands::{runs::RunsCommand, status::StatusCommand, sync::SyncCommand};
use membersync_core::config::Config;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "membersync",
    version,
    about = "Incremental member-record reconciliation"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile member records against the downstream system
    Sync(SyncCommand),
    /// Show tracking table status
    Status(StatusCommand),
    /// View recent reconciliation runs
    Runs(RunsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Setup tracing: -v flags override the configured level
    let filter = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(format, &config).await,
        Commands::Status(cmd) => cmd.execute(format, &config).await,
        Commands::Runs(cmd) => cmd.execute(format, &config).await,
    }
}
