//! Common types and utilities shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use parcelview::config::ConfigFile;
use parcelview::fetch::{AsyncReqwestClient, FetchOrchestrator};
use parcelview::geometry::LatLng;
use parcelview::layers::{BaseLayerLoader, BaseLayers, LoadOutcome};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CliError;

/// Orchestrator type used by every networked command.
pub type Orchestrator = FetchOrchestrator<AsyncReqwestClient>;

/// Base layer loader over [`Orchestrator`].
pub type Loader = BaseLayerLoader<AsyncReqwestClient>;

/// Load the configuration from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Build the cached fetch orchestrator described by `config`.
pub async fn build_orchestrator(config: &ConfigFile) -> Result<Arc<Orchestrator>, CliError> {
    let client =
        AsyncReqwestClient::with_timeout(config.service.timeout).map_err(CliError::Client)?;
    let orchestrator = FetchOrchestrator::new(client, config.cache_config()).await;
    Ok(Arc::new(orchestrator))
}

/// Token cancelled when the user presses Ctrl-C.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling requests");
            child.cancel();
        }
    });
    token
}

/// Base layer loader backed by a fresh orchestrator.
pub async fn district_loader(config: &ConfigFile) -> Result<Arc<Loader>, CliError> {
    let orchestrator = build_orchestrator(config).await?;
    let loader = BaseLayerLoader::new(orchestrator, config.loader_settings());
    Ok(Arc::new(loader))
}

/// Load the base layers of `district`, aborting on Ctrl-C.
pub async fn load_district(
    loader: &Arc<Loader>,
    district: &str,
) -> Result<Arc<BaseLayers>, CliError> {
    let interrupt = interrupt_token();
    let watcher = {
        let loader = Arc::clone(loader);
        tokio::spawn(async move {
            interrupt.cancelled().await;
            loader.cancel();
        })
    };

    let outcome = loader.load(district).await;
    watcher.abort();

    match outcome? {
        LoadOutcome::Skipped => Err(CliError::InvalidArgument(
            "district code must not be empty".to_string(),
        )),
        _ => loader.layers().ok_or_else(|| {
            CliError::InvalidArgument(format!("district '{}' has no loaded layers", district))
        }),
    }
}

/// Parse a `lat,lng` pair in decimal degrees.
pub fn parse_lat_lng(s: &str) -> Result<LatLng, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'lat,lng', got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lng.trim()))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {} out of range", lat));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(format!("longitude {} out of range", lng));
    }
    Ok(LatLng::new(lat, lng))
}

/// Render feature properties as `key=value` pairs, sorted by key.
pub fn format_properties(properties: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut pairs: Vec<String> = properties
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("{}={}", key, s),
            other => format!("{}={}", key, other),
        })
        .collect();
    pairs.sort();
    pairs.join(", ")
}
