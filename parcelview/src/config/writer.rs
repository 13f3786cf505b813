//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::duration::format_duration;
use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let service = &config.service;
    let layers = &config.layers;
    let cache = &config.cache;
    let picking = &config.picking;
    let logging = &config.logging;

    format!(
        r#"[service]
; WFS endpoint of the GeoServer instance (OWS URL, without query)
base_url = {}
; Workspace prefixed to every layer name (typeName = workspace:layer)
workspace = {}
; WFS protocol version (default: 1.0.0)
version = {}
; Spatial reference requested for features (default: EPSG:4326)
srs_name = {}
; HTTP request timeout (default: 60s). Supports ms, s, m, h, d suffixes
timeout = {}

[layers]
; Layer names on the feature service
block = {}
lot = {}
building = {}
construction = {}
door = {}
; Attribute fields
district_field = {}
block_code_field = {}
lot_code_field = {}
sector_field = {}
; Floor code of constructions, used to split them into one group per floor
floor_field = {}
; Feature cap for district base layer requests (default: 200000)
max_features = {}

[cache]
; Master switch. When false every request goes to the network
enabled = {}
; Cache format version. Change it to invalidate every stored response
version = {}
; Decoded responses kept in memory (default: 25)
memory_entries = {}
; Time-to-live of cached responses. Supports ms, s, m, h, d suffixes
default_ttl = {}
base_ttl = {}
query_ttl = {}
; Durable store directory (one file per response)
directory = {}
durable_enabled = {}
; Responses kept after each prune (default: 60)
durable_max_entries = {}
; Larger responses are never persisted (default: 8MB). Supports KB, MB, GB suffixes
max_raw_size = {}
; Fallback store, used only when the durable store is unavailable
fallback_file = {}
; Largest response the fallback store accepts (default: 650000)
fallback_max_entry_size = {}
; Total fallback store size (default: 5MB)
fallback_quota = {}

[picking]
; Point features within this many meters of a click are hit (default: 8)
point_tolerance_m = {}
; Line features within this many screen pixels of a click are hit (default: 6)
line_tolerance_px = {}
; Zoom level at which line distances are measured in pixels (default: 18)
zoom = {}

[logging]
directory = {}
file = {}
"#,
        service.base_url,
        service.workspace,
        service.version,
        service.srs_name,
        format_duration(service.timeout),
        layers.block,
        layers.lot,
        layers.building,
        layers.construction,
        layers.door,
        layers.district_field,
        layers.block_code_field,
        layers.lot_code_field,
        layers.sector_field,
        layers.floor_field,
        layers.max_features,
        cache.enabled,
        cache.version,
        cache.memory_entries,
        format_duration(cache.default_ttl),
        format_duration(cache.base_ttl),
        format_duration(cache.query_ttl),
        path_to_string(&cache.directory),
        cache.durable_enabled,
        cache.durable_max_entries,
        format_size(cache.max_raw_size),
        path_to_string(&cache.fallback_file),
        format_size(cache.fallback_max_entry_size),
        format_size(cache.fallback_quota),
        picking.point_tolerance_m,
        picking.line_tolerance_px,
        picking.zoom,
        path_to_string(&logging.directory),
        logging.file,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::ConfigFile;
    use ini::Ini;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_written_config_parses_back() {
        let mut config = ConfigFile::default();
        config.service.workspace = "muni".to_string();
        config.cache.enabled = false;
        config.cache.base_ttl = Duration::from_secs(3_600);
        config.cache.directory = PathBuf::from("/var/cache/pv");
        config.picking.point_tolerance_m = 12.5;

        let content = to_config_string(&config);
        let ini = Ini::load_from_str(&content).unwrap();
        let parsed = super::super::parser::parse_ini(&ini).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_written_config_has_every_section() {
        let content = to_config_string(&ConfigFile::default());
        for section in ["[service]", "[layers]", "[cache]", "[picking]", "[logging]"] {
            assert!(content.contains(section), "missing {section}");
        }
    }
}
