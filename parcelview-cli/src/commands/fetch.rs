//! Fetch command: request one layer through the response cache.

use std::path::PathBuf;

use clap::Args;
use parcelview::config::ConfigFile;
use parcelview::fetch::{build_feature_query, district_filter, FeatureQuery, FetchOptions};
use parcelview::layers::decode_features;

use super::common::{build_orchestrator, interrupt_token};
use crate::error::CliError;

/// Arguments for `parcelview fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Layer name on the feature service (e.g. tg_lote)
    pub layer: String,

    /// Only features of this district code
    #[arg(long, conflicts_with = "filter")]
    pub district: Option<String>,

    /// Raw CQL filter
    #[arg(long)]
    pub filter: Option<String>,

    /// Maximum number of features requested
    #[arg(long)]
    pub max_features: Option<u32>,

    /// Skip cached copies and refresh them from the network
    #[arg(long)]
    pub force: bool,

    /// Add a timestamp parameter so intermediaries do not serve a stale copy
    #[arg(long)]
    pub bypass_cache: bool,

    /// Write the GeoJSON response to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Print cache statistics after the request
    #[arg(long)]
    pub stats: bool,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs, config: &ConfigFile) -> Result<(), CliError> {
    let mut query = FeatureQuery::default()
        .with_max_features(args.max_features.unwrap_or(config.layers.max_features));
    if let Some(district) = &args.district {
        query = query.with_filter(district_filter(&config.layers.district_field, district));
    }
    if let Some(filter) = &args.filter {
        query = query.with_filter(filter.clone());
    }
    if args.bypass_cache {
        query = query.bypassing_cache();
    }

    let url = build_feature_query(&config.wfs_service(), &args.layer, &query)?;
    let orchestrator = build_orchestrator(config).await?;

    let mut options = FetchOptions::default()
        .with_ttl(config.cache.query_ttl)
        .with_cancel(interrupt_token());
    if args.force {
        options = options.forced();
    }

    let collection = orchestrator.fetch_geojson(&url, options).await?;
    let decoded = decode_features(&collection);

    println!(
        "{}: {} features ({} pickable)",
        args.layer,
        collection.len(),
        decoded.len()
    );

    if let Some(path) = &args.output {
        std::fs::write(path, collection.as_value().to_string()).map_err(|error| CliError::FileWrite {
            path: path.clone(),
            error,
        })?;
        println!("Saved to {}", path.display());
    }

    if args.stats {
        println!();
        println!("{}", orchestrator.stats().format());
    }

    Ok(())
}
