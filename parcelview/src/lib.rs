//! parcelview - cached feature fetching and hit-testing for cadastral maps
//!
//! This library is the client-side core of a parcel map viewer backed by a
//! WFS feature service. It fetches GeoJSON layers through a tiered response
//! cache, decodes them into pickable features, and resolves map clicks to
//! the most specific feature under the cursor.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use parcelview::config::ConfigFile;
//! use parcelview::fetch::{AsyncReqwestClient, FetchOrchestrator};
//! use parcelview::layers::BaseLayerLoader;
//!
//! let config = ConfigFile::load()?;
//! let client = AsyncReqwestClient::with_timeout(config.service.timeout)?;
//! let orchestrator = Arc::new(FetchOrchestrator::new(client, config.cache_config()).await);
//!
//! let loader = BaseLayerLoader::new(orchestrator, config.loader_settings());
//! loader.load("150112").await?;
//! ```

pub mod cache;
pub mod config;
pub mod fetch;
pub mod geometry;
pub mod layers;
pub mod logging;
pub mod pick;
pub mod time;

/// Version of the parcelview library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
