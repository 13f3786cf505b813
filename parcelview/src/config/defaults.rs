//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::time::Duration;

use super::settings::*;
use crate::cache::{
    default_cache_root, DEFAULT_CACHE_VERSION, DEFAULT_DURABLE_MAX_ENTRIES,
    DEFAULT_FALLBACK_MAX_ENTRY_BYTES, DEFAULT_FALLBACK_QUOTA_BYTES, DEFAULT_MAX_RAW_BYTES,
    DEFAULT_MEMORY_ENTRIES, DEFAULT_TTL,
};
use crate::fetch::{DEFAULT_SRS_NAME, DEFAULT_TIMEOUT, DEFAULT_WFS_VERSION};
use crate::layers::BASE_MAX_FEATURES;
use crate::pick::{DEFAULT_LINE_TOLERANCE_PX, DEFAULT_PICK_ZOOM, DEFAULT_POINT_TOLERANCE_M};

// =============================================================================
// Service defaults
// =============================================================================

/// Placeholder endpoint; point it at a real GeoServer OWS URL.
pub const DEFAULT_SERVICE_URL: &str = "https://geoserver.example.org/geoserver/catastro/ows";

/// Default workspace.
pub const DEFAULT_WORKSPACE: &str = "catastro";

// =============================================================================
// Layer defaults
// =============================================================================

pub const DEFAULT_BLOCK_LAYER: &str = "tg_manzana";
pub const DEFAULT_LOT_LAYER: &str = "tg_lote";
pub const DEFAULT_BUILDING_LAYER: &str = "tg_edifica";
pub const DEFAULT_CONSTRUCTION_LAYER: &str = "tg_construccion_2";
pub const DEFAULT_DOOR_LAYER: &str = "tg_puerta";

pub const DEFAULT_DISTRICT_FIELD: &str = "ubigeo";
pub const DEFAULT_BLOCK_CODE_FIELD: &str = "cod_mzna";
pub const DEFAULT_LOT_CODE_FIELD: &str = "cod_lote";
pub const DEFAULT_SECTOR_FIELD: &str = "cod_sector";
pub const DEFAULT_FLOOR_FIELD: &str = "cod_piso";

// =============================================================================
// Cache defaults
// =============================================================================

/// Default TTL for district base layers (24 h).
pub const DEFAULT_BASE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default TTL for overlay and point queries (24 h).
pub const DEFAULT_QUERY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "parcelview.log";

// =============================================================================
// ConfigFile::default()
// =============================================================================

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();
        let cache_dir = default_cache_root();

        Self {
            service: ServiceSettings {
                base_url: DEFAULT_SERVICE_URL.to_string(),
                workspace: DEFAULT_WORKSPACE.to_string(),
                version: DEFAULT_WFS_VERSION.to_string(),
                srs_name: DEFAULT_SRS_NAME.to_string(),
                timeout: DEFAULT_TIMEOUT,
            },
            layers: LayerSettings {
                block: DEFAULT_BLOCK_LAYER.to_string(),
                lot: DEFAULT_LOT_LAYER.to_string(),
                building: DEFAULT_BUILDING_LAYER.to_string(),
                construction: DEFAULT_CONSTRUCTION_LAYER.to_string(),
                door: DEFAULT_DOOR_LAYER.to_string(),
                district_field: DEFAULT_DISTRICT_FIELD.to_string(),
                block_code_field: DEFAULT_BLOCK_CODE_FIELD.to_string(),
                lot_code_field: DEFAULT_LOT_CODE_FIELD.to_string(),
                sector_field: DEFAULT_SECTOR_FIELD.to_string(),
                floor_field: DEFAULT_FLOOR_FIELD.to_string(),
                max_features: BASE_MAX_FEATURES,
            },
            cache: CacheSettings {
                enabled: true,
                version: DEFAULT_CACHE_VERSION.to_string(),
                memory_entries: DEFAULT_MEMORY_ENTRIES,
                default_ttl: DEFAULT_TTL,
                base_ttl: DEFAULT_BASE_TTL,
                query_ttl: DEFAULT_QUERY_TTL,
                directory: cache_dir.join("http"),
                durable_enabled: true,
                durable_max_entries: DEFAULT_DURABLE_MAX_ENTRIES,
                max_raw_size: DEFAULT_MAX_RAW_BYTES,
                fallback_file: cache_dir.join("fallback.json"),
                fallback_max_entry_size: DEFAULT_FALLBACK_MAX_ENTRY_BYTES,
                fallback_quota: DEFAULT_FALLBACK_QUOTA_BYTES,
            },
            picking: PickingSettings {
                point_tolerance_m: DEFAULT_POINT_TOLERANCE_M,
                line_tolerance_px: DEFAULT_LINE_TOLERANCE_PX,
                zoom: DEFAULT_PICK_ZOOM,
            },
            logging: LoggingSettings {
                directory: config_dir.join("logs"),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
