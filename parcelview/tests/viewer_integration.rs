//! Integration tests for the viewer core.
//!
//! These tests drive the public API the way a map front end does:
//! - District base loading through the cached fetch orchestrator
//! - Overlay loading and per-floor grouping
//! - Click picking across prioritised layer groups
//! - Code search over loaded layers
//! - Cache reuse across sessions and cache clearing

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use parcelview::cache::CacheConfig;
use parcelview::config::ConfigFile;
use parcelview::fetch::{
    build_feature_query, AsyncHttpClient, FeatureQuery, FetchError, FetchOptions,
    FetchOrchestrator, HttpResponse,
};
use parcelview::geometry::LatLng;
use parcelview::layers::{
    matches_bounds, search_blocks, search_lots, BaseLayerLoader, LoadOutcome, LoaderError,
    SearchQuery,
};
use parcelview::pick::{HitPicker, PickLayer};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

const BLOCKS: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"ubigeo":"150112","cod_sector":"01","cod_mzna":"033"},
     "geometry":{"type":"Polygon","coordinates":[[[-77.060,-11.990],[-77.040,-11.990],[-77.040,-11.980],[-77.060,-11.980],[-77.060,-11.990]]]}},
    {"type":"Feature","properties":{"ubigeo":"150112","cod_sector":"02","cod_mzna":"034"},
     "geometry":{"type":"Polygon","coordinates":[[[-77.040,-11.990],[-77.030,-11.990],[-77.030,-11.980],[-77.040,-11.980],[-77.040,-11.990]]]}}
]}"#;

const LOTS: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"cod_mzna":"033","cod_lote":"001"},
     "geometry":{"type":"Polygon","coordinates":[[[-77.055,-11.989],[-77.053,-11.989],[-77.053,-11.987],[-77.055,-11.987],[-77.055,-11.989]]]}},
    {"type":"Feature","properties":{"cod_mzna":"033","cod_lote":"002"},
     "geometry":{"type":"Polygon","coordinates":[[[-77.050,-11.989],[-77.048,-11.989],[-77.048,-11.987],[-77.050,-11.987],[-77.050,-11.989]]]}}
]}"#;

const BUILDINGS: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"cod_edifica":"E1"},
     "geometry":{"type":"Polygon","coordinates":[[[-77.0545,-11.9885],[-77.0535,-11.9885],[-77.0535,-11.9875],[-77.0545,-11.9875],[-77.0545,-11.9885]]]}}
]}"#;

const CONSTRUCTIONS: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"cod_piso":"01"},
     "geometry":{"type":"Polygon","coordinates":[[[-77.0545,-11.9885],[-77.0535,-11.9885],[-77.0535,-11.9875],[-77.0545,-11.9875],[-77.0545,-11.9885]]]}},
    {"type":"Feature","properties":{"cod_piso":"02"},
     "geometry":{"type":"Polygon","coordinates":[[[-77.0542,-11.9882],[-77.0538,-11.9882],[-77.0538,-11.9878],[-77.0542,-11.9878],[-77.0542,-11.9882]]]}}
]}"#;

const DOORS: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"num_puerta":"120"},
     "geometry":{"type":"Point","coordinates":[-77.0500,-11.9870]}}
]}"#;

const EMPTY: &str = r#"{"type":"FeatureCollection","features":[]}"#;

/// Feature server answering by layer name and counting requests.
#[derive(Clone)]
struct CadastreServer {
    calls: Arc<AtomicUsize>,
    status: Arc<AtomicU16>,
}

impl CadastreServer {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            status: Arc::new(AtomicU16::new(200)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail_with(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }
}

impl AsyncHttpClient for CadastreServer {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let body = if url.contains("tg_manzana") {
            BLOCKS
        } else if url.contains("tg_lote") {
            LOTS
        } else if url.contains("tg_edifica") {
            BUILDINGS
        } else if url.contains("tg_construccion_2") {
            CONSTRUCTIONS
        } else if url.contains("tg_puerta") {
            DOORS
        } else {
            EMPTY
        };

        Ok(HttpResponse {
            status: self.status.load(Ordering::SeqCst),
            content_type: Some("application/json;charset=UTF-8".to_string()),
            body: body.as_bytes().to_vec(),
        })
    }
}

fn config_for(dir: &TempDir) -> ConfigFile {
    let mut config = ConfigFile::default();
    config.cache.directory = dir.path().join("http");
    config.cache.fallback_file = dir.path().join("fallback.json");
    config
}

async fn loader_for(
    server: &CadastreServer,
    config: &ConfigFile,
) -> BaseLayerLoader<CadastreServer> {
    let orchestrator = FetchOrchestrator::new(server.clone(), config.cache_config()).await;
    BaseLayerLoader::new(Arc::new(orchestrator), config.loader_settings())
}

// =============================================================================
// Loading and picking
// =============================================================================

#[tokio::test]
async fn test_load_and_pick_base_layers() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let server = CadastreServer::new();
    let loader = loader_for(&server, &config).await;

    let outcome = loader.load("150112").await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { .. }));
    assert_eq!(server.calls(), 3);

    let layers = loader.layers().unwrap();
    let picker = HitPicker::new(config.pick_settings());
    let priority = vec![
        PickLayer::new(&layers.buildings, |_| Some("building")),
        PickLayer::new(&layers.lots, |_| Some("lot")),
        PickLayer::new(&layers.blocks, |_| Some("block")),
    ];

    // Building over lot 001 shadows the lot and the block
    let hit = picker.pick(LatLng::new(-11.9880, -77.0540), &priority).unwrap();
    assert_eq!(hit.payload, "building");

    // Lot 002 has no building
    let hit = picker.pick(LatLng::new(-11.9880, -77.0490), &priority).unwrap();
    assert_eq!(hit.payload, "lot");
    assert_eq!(hit.feature.property_text("cod_lote").as_deref(), Some("002"));

    // Open block area
    let hit = picker.pick(LatLng::new(-11.9820, -77.0450), &priority).unwrap();
    assert_eq!(hit.payload, "block");
    assert_eq!(hit.feature.property_text("cod_mzna").as_deref(), Some("033"));

    assert!(picker.pick(LatLng::new(-12.1, -77.1), &priority).is_none());
}

#[tokio::test]
async fn test_overlays_pick_door_and_upper_floor() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let server = CadastreServer::new();
    let loader = loader_for(&server, &config).await;
    loader.load("150112").await.unwrap();

    let doors = loader
        .load_overlay(&config.layers.door, "150112", None)
        .await
        .unwrap();
    let constructions = loader
        .load_overlay(&config.layers.construction, "150112", None)
        .await
        .unwrap();
    let floors = constructions.by_floor(&config.layers.floor_field);
    assert_eq!(
        floors.iter().map(|f| f.name()).collect::<Vec<_>>(),
        vec!["01", "02"]
    );

    let layers = loader.layers().unwrap();
    let picker = HitPicker::new(config.pick_settings());
    let priority = vec![
        PickLayer::new(&doors, |_| Some("door")),
        PickLayer::merged(floors.iter().collect(), |_| Some("construction")),
        PickLayer::new(&layers.buildings, |_| Some("building")),
        PickLayer::new(&layers.lots, |_| Some("lot")),
    ];

    // Smallest construction across floors wins
    let hit = picker.pick(LatLng::new(-11.9880, -77.0540), &priority).unwrap();
    assert_eq!(hit.payload, "construction");
    assert_eq!(hit.group, "02");

    // A couple of metres from the door marker
    let hit = picker.pick(LatLng::new(-11.98700, -77.05002), &priority).unwrap();
    assert_eq!(hit.payload, "door");
    assert_eq!(hit.area, 0.0);
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_loaded_district() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let server = CadastreServer::new();
    let loader = loader_for(&server, &config).await;
    loader.load("150112").await.unwrap();
    let layers = loader.layers().unwrap();
    let fields = config.search_fields();

    let lot_query = SearchQuery::new("150112", "", "33", "1").unwrap();
    let lots = search_lots(&layers.lots, &lot_query, &fields);
    assert_eq!(lots.len(), 1);
    assert_eq!(lot_query.describe(lots.len()), "Lot 001 (block 033) found");

    let bounds = matches_bounds(&lots).unwrap();
    assert_eq!(bounds.west, -77.055);
    assert_eq!(bounds.north, -11.987);

    let sector_query = SearchQuery::new("150112", "2", "", "").unwrap();
    let blocks = search_blocks(&layers.blocks, &sector_query, &fields);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].property_text("cod_mzna").as_deref(), Some("034"));

    let district_query = SearchQuery::new("150112", "", "", "").unwrap();
    let all = search_blocks(&layers.blocks, &district_query, &fields);
    assert_eq!(all.len(), 2);
    let district = loader.district_bounds("150112").unwrap();
    assert_eq!(matches_bounds(&all).unwrap(), district);
}

// =============================================================================
// Caching across sessions
// =============================================================================

#[tokio::test]
async fn test_second_session_served_from_durable_store() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let server = CadastreServer::new();

    let first = loader_for(&server, &config).await;
    first.load("150112").await.unwrap();
    assert_eq!(server.calls(), 3);

    let second = loader_for(&server, &config).await;
    second.load("150112").await.unwrap();
    assert_eq!(server.calls(), 3);
    assert_eq!(second.layers().unwrap().lots.len(), 2);
}

#[tokio::test]
async fn test_cleared_caches_refetch() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let server = CadastreServer::new();
    let orchestrator =
        Arc::new(FetchOrchestrator::new(server.clone(), config.cache_config()).await);

    let query = FeatureQuery::default().with_max_features(10);
    let url = build_feature_query(&config.wfs_service(), "tg_lote", &query).unwrap();

    orchestrator
        .fetch_geojson(&url, FetchOptions::default())
        .await
        .unwrap();
    orchestrator
        .fetch_geojson(&url, FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(server.calls(), 1);

    let summary = orchestrator.clear_all_caches().await;
    assert_eq!(summary.memory, 1);
    assert_eq!(summary.durable, 1);

    orchestrator
        .fetch_geojson(&url, FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(server.calls(), 2);

    let stats = orchestrator.stats();
    assert_eq!(stats.stats.network_fetches, 2);
    assert_eq!(stats.stats.memory_hits, 1);
}

#[tokio::test]
async fn test_failed_load_keeps_loader_usable() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let server = CadastreServer::new();
    let loader = loader_for(&server, &config).await;

    server.fail_with(503);
    let err = loader.load("150112").await.unwrap_err();
    let LoaderError::Fetch { source, .. } = &err;
    assert_eq!(*source, FetchError::Http { status: 503 });
    assert!(!loader.is_loading());
    assert!(loader.layers().is_none());

    server.fail_with(200);
    let outcome = loader.load("150112").await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { .. }));
    assert_eq!(loader.layers().unwrap().blocks.len(), 2);
}
