//! Cache management CLI commands.

use clap::Subcommand;
use parcelview::config::{format_size, ConfigFile};

use super::common::build_orchestrator;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear every cache tier, removing all stored responses
    Clear,
    /// Show stored response counts per tier
    Stats,
}

/// Run a cache subcommand.
pub async fn run(action: CacheAction, config: &ConfigFile) -> Result<(), CliError> {
    let orchestrator = build_orchestrator(config).await?;

    match action {
        CacheAction::Clear => {
            println!("Clearing caches at: {}", config.cache.directory.display());
            let summary = orchestrator.clear_all_caches().await;
            println!(
                "Removed {} responses ({} durable, {} fallback)",
                summary.total(),
                summary.durable,
                summary.fallback
            );
            Ok(())
        }
        CacheAction::Stats => {
            let durable = orchestrator.durable();
            let fallback = orchestrator.fallback();

            println!("Durable store: {}", durable.directory().display());
            if durable.is_available() {
                match durable.entry_count().await {
                    Ok(count) => println!("  Responses: {}", count),
                    Err(e) => println!("  Unreadable: {}", e),
                }
            } else {
                println!("  Unavailable");
            }
            println!("  Limit:     {}", config.cache.durable_max_entries);
            println!();

            println!("Fallback store: {}", fallback.store().path().display());
            println!("  Responses: {}", fallback.entry_count());
            println!(
                "  Size:      {} of {}",
                format_size(fallback.store().size_bytes()),
                format_size(config.cache.fallback_quota)
            );
            Ok(())
        }
    }
}
