//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;
use std::time::Duration;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Feature service endpoint
    pub service: ServiceSettings,
    /// Layer names and attribute fields
    pub layers: LayerSettings,
    /// Response cache
    pub cache: CacheSettings,
    /// Click hit-testing tolerances
    pub picking: PickingSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Feature service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// OWS endpoint URL
    pub base_url: String,
    /// Workspace prefixed to layer names
    pub workspace: String,
    /// WFS protocol version
    pub version: String,
    /// Requested spatial reference
    pub srs_name: String,
    /// HTTP request timeout
    pub timeout: Duration,
}

/// Layer names and the attribute fields read from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSettings {
    pub block: String,
    pub lot: String,
    pub building: String,
    pub construction: String,
    pub door: String,
    /// Property holding the district code
    pub district_field: String,
    pub block_code_field: String,
    pub lot_code_field: String,
    pub sector_field: String,
    /// Property holding the floor code of constructions
    pub floor_field: String,
    /// Feature cap for base layer requests
    pub max_features: u32,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Master switch
    pub enabled: bool,
    /// Cache-format version tag; changing it invalidates stored entries
    pub version: String,
    /// Memory tier capacity in entries
    pub memory_entries: usize,
    /// TTL for fetches that do not specify one
    pub default_ttl: Duration,
    /// TTL for district base layers
    pub base_ttl: Duration,
    /// TTL for overlay and point queries
    pub query_ttl: Duration,
    /// Durable tier directory
    pub directory: PathBuf,
    /// Whether the durable tier is used
    pub durable_enabled: bool,
    /// Records kept after each prune
    pub durable_max_entries: usize,
    /// Largest response persisted, in bytes
    pub max_raw_size: usize,
    /// Fallback store file
    pub fallback_file: PathBuf,
    /// Largest response the fallback store accepts, in bytes
    pub fallback_max_entry_size: usize,
    /// Total fallback store size, in bytes
    pub fallback_quota: usize,
}

/// Hit-testing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PickingSettings {
    /// Great-circle tolerance for point features, in meters
    pub point_tolerance_m: f64,
    /// Screen tolerance for line features, in pixels
    pub line_tolerance_px: f64,
    /// Zoom level used to convert line distances to pixels
    pub zoom: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory holding the log file
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}
