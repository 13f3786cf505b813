//! District base-layer loading.
//!
//! Buildings, lots and blocks of one district are fetched together. Rapid
//! district changes never pile up: while a load runs, later requests only
//! record the most recent district, which is loaded once the running load
//! completes.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fetch::{
    build_feature_query, district_filter, AsyncHttpClient, FeatureQuery, FetchError,
    FetchOptions, FetchOrchestrator, WfsService,
};
use crate::geometry::BoundingBox;
use crate::layers::district::DistrictBoundsIndex;
use crate::layers::feature::LayerGroup;

/// Feature cap for base layer requests.
pub const BASE_MAX_FEATURES: u32 = 200_000;

/// Feature cap for overlay requests (constructions, doors).
pub const OVERLAY_MAX_FEATURES: u32 = 300_000;

/// Base layer load failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    #[error("Failed to load layer '{layer}': {source}")]
    Fetch {
        layer: String,
        #[source]
        source: FetchError,
    },
}

impl LoaderError {
    /// Whether the load was superseded or aborted rather than failed.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Fetch { source, .. } => source.is_cancelled(),
        }
    }
}

/// Result of [`BaseLayerLoader::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Layers replaced; `district` is the last district loaded, which is a
    /// queued follow-up when one was requested meanwhile.
    Loaded { district: String },
    /// The district is already the current one.
    AlreadyLoaded,
    /// Another load is running; the district will be loaded after it.
    Queued,
    /// Empty district code.
    Skipped,
}

/// Service layer names and the fields base loading depends on.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub service: WfsService,
    pub building_layer: String,
    pub lot_layer: String,
    pub block_layer: String,
    /// Property holding the district code
    pub district_field: String,
    pub max_features: u32,
    /// Cache lifetime of base layer responses
    pub base_ttl: Duration,
    /// Cache lifetime of overlay responses
    pub query_ttl: Duration,
}

/// Layers of the loaded district.
#[derive(Debug, Clone)]
pub struct BaseLayers {
    pub district: String,
    pub buildings: LayerGroup,
    pub lots: LayerGroup,
    pub blocks: LayerGroup,
    /// Rebuilt from the block layer on every load
    pub district_bounds: DistrictBoundsIndex,
}

#[derive(Default)]
struct LoaderState {
    current: Option<String>,
    loading: bool,
    pending: Option<String>,
    cancel: Option<CancellationToken>,
    layers: Option<Arc<BaseLayers>>,
}

/// Clears the loading flag however the load ends, including when the
/// loading future is dropped.
struct LoadingFlag<'a>(&'a Mutex<LoaderState>);

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.lock().loading = false;
    }
}

/// Loads district base layers through the fetch orchestrator.
pub struct BaseLayerLoader<C> {
    orchestrator: Arc<FetchOrchestrator<C>>,
    settings: LoaderSettings,
    state: Mutex<LoaderState>,
}

impl<C: AsyncHttpClient> BaseLayerLoader<C> {
    pub fn new(orchestrator: Arc<FetchOrchestrator<C>>, settings: LoaderSettings) -> Self {
        Self {
            orchestrator,
            settings,
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// Load the base layers of `district`.
    ///
    /// Cancels the previous base request token, fetches the three layers
    /// concurrently and replaces them together. If another district was
    /// requested while loading, it is loaded next before returning.
    ///
    /// # Errors
    ///
    /// [`LoaderError::Fetch`] naming the first layer that failed. The loader
    /// is idle afterwards and the previous layers are kept.
    pub async fn load(&self, district: &str) -> Result<LoadOutcome, LoaderError> {
        let mut requested = district.trim().to_string();
        if requested.is_empty() {
            return Ok(LoadOutcome::Skipped);
        }

        {
            let mut state = self.state.lock();
            if state.loading {
                debug!(district = %requested, "Base load running, queueing district");
                state.pending = Some(requested);
                return Ok(LoadOutcome::Queued);
            }
            if state.current.as_deref() == Some(requested.as_str()) {
                return Ok(LoadOutcome::AlreadyLoaded);
            }
            state.loading = true;
            state.current = None;
            state.pending = None;
        }
        let _loading = LoadingFlag(&self.state);

        loop {
            let token = {
                let mut state = self.state.lock();
                if let Some(previous) = state.cancel.take() {
                    previous.cancel();
                }
                let token = CancellationToken::new();
                state.cancel = Some(token.clone());
                token
            };

            info!(district = %requested, "Loading base layers");
            let layers = match self.fetch_base(&requested, token).await {
                Ok(layers) => layers,
                Err(e) => {
                    if e.is_cancelled() {
                        debug!(district = %requested, "Base load cancelled");
                    } else {
                        warn!(district = %requested, error = %e, "Base load failed");
                    }
                    self.state.lock().pending = None;
                    return Err(e);
                }
            };

            let mut state = self.state.lock();
            info!(
                district = %requested,
                buildings = layers.buildings.len(),
                lots = layers.lots.len(),
                blocks = layers.blocks.len(),
                "Base layers loaded"
            );
            state.layers = Some(Arc::new(layers));
            state.current = Some(requested.clone());

            match state.pending.take() {
                Some(queued) if queued != requested => {
                    debug!(from = %requested, to = %queued, "Loading queued district");
                    state.current = None;
                    requested = queued;
                }
                _ => {
                    drop(state);
                    return Ok(LoadOutcome::Loaded {
                        district: requested,
                    });
                }
            }
        }
    }

    /// Fetch one overlay layer of `district` (constructions, doors, ...).
    pub async fn load_overlay(
        &self,
        layer: &str,
        district: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<LayerGroup, LoaderError> {
        let mut options = FetchOptions::default().with_ttl(self.settings.query_ttl);
        options.cancel = cancel;
        self.fetch_layer(layer, district, OVERLAY_MAX_FEATURES, options)
            .await
    }

    /// Abort the running base load, if any.
    pub fn cancel(&self) {
        if let Some(token) = &self.state.lock().cancel {
            token.cancel();
        }
    }

    /// Layers of the current district.
    pub fn layers(&self) -> Option<Arc<BaseLayers>> {
        self.state.lock().layers.clone()
    }

    /// District whose layers are loaded, if no load is replacing them.
    pub fn current_district(&self) -> Option<String> {
        self.state.lock().current.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Bounds of a district from the last loaded block layer.
    pub fn district_bounds(&self, code: &str) -> Option<BoundingBox> {
        self.state
            .lock()
            .layers
            .as_ref()
            .and_then(|layers| layers.district_bounds.get(code).copied())
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    async fn fetch_base(
        &self,
        district: &str,
        cancel: CancellationToken,
    ) -> Result<BaseLayers, LoaderError> {
        let options = FetchOptions::default()
            .with_ttl(self.settings.base_ttl)
            .with_cancel(cancel);
        let max = self.settings.max_features;

        let (buildings, lots, blocks) = tokio::try_join!(
            self.fetch_layer(&self.settings.building_layer, district, max, options.clone()),
            self.fetch_layer(&self.settings.lot_layer, district, max, options.clone()),
            self.fetch_layer(&self.settings.block_layer, district, max, options),
        )?;

        let district_bounds =
            DistrictBoundsIndex::from_features(blocks.features(), &self.settings.district_field);

        Ok(BaseLayers {
            district: district.to_string(),
            buildings,
            lots,
            blocks,
            district_bounds,
        })
    }

    async fn fetch_layer(
        &self,
        layer: &str,
        district: &str,
        max_features: u32,
        options: FetchOptions,
    ) -> Result<LayerGroup, LoaderError> {
        let to_error = |source: FetchError| LoaderError::Fetch {
            layer: layer.to_string(),
            source,
        };

        let query = FeatureQuery::default()
            .with_max_features(max_features)
            .with_filter(district_filter(&self.settings.district_field, district));
        let url = build_feature_query(&self.settings.service, layer, &query).map_err(to_error)?;

        let collection = self
            .orchestrator
            .fetch_geojson(&url, options)
            .await
            .map_err(to_error)?;

        Ok(LayerGroup::from_collection(layer, &collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::fetch::HttpResponse;
    use crate::time::ManualClock;
    use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
    use tempfile::TempDir;

    const BLOCKS: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"ubigeo":"150112","cod_mzna":"033"},
         "geometry":{"type":"Polygon","coordinates":[[[-77.06,-11.99],[-77.05,-11.98],[-77.04,-11.99],[-77.06,-11.99]]]}}]}"#;
    const LOTS: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"cod_mzna":"033","cod_lote":"001"},
         "geometry":{"type":"Polygon","coordinates":[[[-77.055,-11.989],[-77.054,-11.988],[-77.053,-11.989],[-77.055,-11.989]]]}},
        {"type":"Feature","properties":{"cod_mzna":"033","cod_lote":"002"},
         "geometry":{"type":"Polygon","coordinates":[[[-77.052,-11.989],[-77.051,-11.988],[-77.050,-11.989],[-77.052,-11.989]]]}}]}"#;
    const EMPTY: &str = r#"{"type":"FeatureCollection","features":[]}"#;

    #[derive(Clone)]
    struct LayerServer {
        calls: Arc<AtomicUsize>,
        status: Arc<AtomicU16>,
        delay: Duration,
    }

    impl LayerServer {
        fn new(delay: Duration) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                status: Arc::new(AtomicU16::new(200)),
                delay,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AsyncHttpClient for LayerServer {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;

            let body = if url.contains("tg_manzana") {
                BLOCKS
            } else if url.contains("tg_lote") {
                LOTS
            } else {
                EMPTY
            };
            Ok(HttpResponse {
                status: self.status.load(Ordering::SeqCst),
                content_type: Some("application/json".to_string()),
                body: body.as_bytes().to_vec(),
            })
        }
    }

    fn settings() -> LoaderSettings {
        LoaderSettings {
            service: WfsService::new("https://geo.example.org/geoserver/catastro/ows", "catastro"),
            building_layer: "tg_edifica".to_string(),
            lot_layer: "tg_lote".to_string(),
            block_layer: "tg_manzana".to_string(),
            district_field: "ubigeo".to_string(),
            max_features: BASE_MAX_FEATURES,
            base_ttl: Duration::from_secs(3600),
            query_ttl: Duration::from_secs(3600),
        }
    }

    async fn loader(server: LayerServer, dir: &TempDir) -> BaseLayerLoader<LayerServer> {
        let config = CacheConfig::default().with_cache_dir(dir.path().to_path_buf());
        let clock = Arc::new(ManualClock::new(1_000_000));
        let orchestrator = FetchOrchestrator::with_clock(server, config, clock).await;
        BaseLayerLoader::new(Arc::new(orchestrator), settings())
    }

    #[tokio::test]
    async fn test_load_replaces_layers_and_bounds() {
        let dir = TempDir::new().unwrap();
        let server = LayerServer::new(Duration::ZERO);
        let loader = loader(server.clone(), &dir).await;

        let outcome = loader.load(" 150112 ").await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                district: "150112".to_string()
            }
        );
        assert_eq!(server.calls(), 3);
        assert!(!loader.is_loading());
        assert_eq!(loader.current_district().as_deref(), Some("150112"));

        let layers = loader.layers().unwrap();
        assert_eq!(layers.blocks.len(), 1);
        assert_eq!(layers.lots.len(), 2);
        assert!(layers.buildings.is_empty());

        let bounds = loader.district_bounds("150112").unwrap();
        assert_eq!(bounds.west, -77.06);
        assert_eq!(bounds.north, -11.98);
    }

    #[tokio::test]
    async fn test_empty_and_repeated_district() {
        let dir = TempDir::new().unwrap();
        let server = LayerServer::new(Duration::ZERO);
        let loader = loader(server.clone(), &dir).await;

        assert_eq!(loader.load("   ").await.unwrap(), LoadOutcome::Skipped);
        assert_eq!(server.calls(), 0);

        loader.load("150112").await.unwrap();
        assert_eq!(loader.load("150112").await.unwrap(), LoadOutcome::AlreadyLoaded);
        assert_eq!(server.calls(), 3);
    }

    #[tokio::test]
    async fn test_requests_during_load_collapse_into_one_follow_up() {
        let dir = TempDir::new().unwrap();
        let server = LayerServer::new(Duration::from_millis(100));
        let loader = loader(server.clone(), &dir).await;

        let later = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let a = loader.load("150110").await.unwrap();
            let b = loader.load("150111").await.unwrap();
            (a, b)
        };

        let (first, (a, b)) = tokio::join!(loader.load("150112"), later);
        assert_eq!(a, LoadOutcome::Queued);
        assert_eq!(b, LoadOutcome::Queued);
        assert_eq!(
            first.unwrap(),
            LoadOutcome::Loaded {
                district: "150111".to_string()
            }
        );
        // 150110 was superseded before it started
        assert_eq!(server.calls(), 6);
        assert_eq!(loader.current_district().as_deref(), Some("150111"));
    }

    #[tokio::test]
    async fn test_queueing_the_running_district_loads_nothing_more() {
        let dir = TempDir::new().unwrap();
        let server = LayerServer::new(Duration::from_millis(50));
        let loader = loader(server.clone(), &dir).await;

        let again = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            loader.load("150112").await.unwrap()
        };

        let (first, queued) = tokio::join!(loader.load("150112"), again);
        assert_eq!(queued, LoadOutcome::Queued);
        assert!(matches!(first.unwrap(), LoadOutcome::Loaded { .. }));
        assert_eq!(server.calls(), 3);
    }

    #[tokio::test]
    async fn test_failure_leaves_loader_idle() {
        let dir = TempDir::new().unwrap();
        let server = LayerServer::new(Duration::ZERO);
        server.status.store(500, Ordering::SeqCst);
        let loader = loader(server.clone(), &dir).await;

        let err = loader.load("150112").await.unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Fetch {
                source: FetchError::Http { status: 500 },
                ..
            }
        ));
        assert!(!err.is_cancelled());
        assert!(!loader.is_loading());
        assert!(loader.layers().is_none());
        assert!(loader.current_district().is_none());

        server.status.store(200, Ordering::SeqCst);
        assert!(matches!(
            loader.load("150112").await.unwrap(),
            LoadOutcome::Loaded { .. }
        ));
    }

    #[tokio::test]
    async fn test_cancel_aborts_running_load() {
        let dir = TempDir::new().unwrap();
        let server = LayerServer::new(Duration::from_secs(30));
        let loader = loader(server, &dir).await;

        let cancel = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            loader.cancel();
        };

        let (result, ()) = tokio::join!(loader.load("150112"), cancel);
        assert!(result.unwrap_err().is_cancelled());
        assert!(!loader.is_loading());
    }

    #[tokio::test]
    async fn test_dropped_load_clears_loading_flag() {
        let dir = TempDir::new().unwrap();
        let server = LayerServer::new(Duration::from_secs(30));
        let loader = loader(server, &dir).await;

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), loader.load("150112")).await;
        assert!(timed_out.is_err());
        assert!(!loader.is_loading());
    }

    #[tokio::test]
    async fn test_load_overlay() {
        let dir = TempDir::new().unwrap();
        let server = LayerServer::new(Duration::ZERO);
        let loader = loader(server.clone(), &dir).await;

        let lots = loader.load_overlay("tg_lote", "150112", None).await.unwrap();
        assert_eq!(lots.name(), "tg_lote");
        assert_eq!(lots.len(), 2);
        assert_eq!(server.calls(), 1);
    }
}
