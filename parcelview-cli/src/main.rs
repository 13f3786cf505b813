//! parcelview CLI - Command-line interface
//!
//! This binary exposes the parcelview library: cached layer requests,
//! click picking, measurements, code search and cache maintenance.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parcelview::config::ConfigFile;
use parcelview::logging::init_logging;
use tracing::debug;

use commands::area::AreaArgs;
use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::pick::PickArgs;
use commands::search::SearchArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "parcelview")]
#[command(version = parcelview::VERSION)]
#[command(about = "Cadastral map client: cached WFS layers, picking and search", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.parcelview/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request one layer through the response cache
    Fetch(FetchArgs),

    /// Find the feature under a map click
    Pick(PickArgs),

    /// Measure the area of a polygon or the length of a path
    Area(AreaArgs),

    /// Find blocks or lots by code
    Search(SearchArgs),

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();
    match cli.command {
        // Neither configuration nor logging needed
        Commands::Area(args) => commands::area::run(args),
        Commands::Config { command } => commands::config::run(command, config_path),
        command => {
            let config = commands::common::load_config(config_path)?;
            let _logging = start_logging(&config, cli.verbose)?;
            run_with_config(command, &config).await
        }
    }
}

async fn run_with_config(command: Commands, config: &ConfigFile) -> Result<(), CliError> {
    match command {
        Commands::Fetch(args) => commands::fetch::run(args, config).await,
        Commands::Pick(args) => commands::pick::run(args, config).await,
        Commands::Search(args) => commands::search::run(args, config).await,
        Commands::Cache { action } => commands::cache::run(action, config).await,
        Commands::Area(args) => commands::area::run(args),
        Commands::Config { command } => commands::config::run(command, None),
    }
}

fn start_logging(
    config: &ConfigFile,
    verbose: bool,
) -> Result<parcelview::logging::LoggingGuard, CliError> {
    let level = if verbose { "debug" } else { "info" };
    let guard = init_logging(&config.logging.directory, &config.logging.file, level)
        .map_err(CliError::LoggingInit)?;
    debug!(log = %guard.path().display(), version = parcelview::VERSION, "Logging started");
    Ok(guard)
}
