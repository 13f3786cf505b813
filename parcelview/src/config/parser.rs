//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::duration::parse_duration;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [service] section
    if let Some(section) = ini.section(Some("service")) {
        let s = Section::new("service", section);
        if let Some(v) = s.text("base_url") {
            if reqwest::Url::parse(&v).is_err() {
                return Err(s.invalid("base_url", &v, "must be an absolute URL"));
            }
            config.service.base_url = v;
        }
        if let Some(v) = s.text("workspace") {
            config.service.workspace = v;
        }
        if let Some(v) = s.text("version") {
            config.service.version = v;
        }
        if let Some(v) = s.text("srs_name") {
            config.service.srs_name = v;
        }
        if let Some(v) = s.duration("timeout")? {
            if v.is_zero() {
                return Err(s.invalid("timeout", "0", "must be greater than zero"));
            }
            config.service.timeout = v;
        }
    }

    // [layers] section
    if let Some(section) = ini.section(Some("layers")) {
        let s = Section::new("layers", section);
        let layers = &mut config.layers;
        for (key, field) in [
            ("block", &mut layers.block),
            ("lot", &mut layers.lot),
            ("building", &mut layers.building),
            ("construction", &mut layers.construction),
            ("door", &mut layers.door),
            ("district_field", &mut layers.district_field),
            ("block_code_field", &mut layers.block_code_field),
            ("lot_code_field", &mut layers.lot_code_field),
            ("sector_field", &mut layers.sector_field),
            ("floor_field", &mut layers.floor_field),
        ] {
            if let Some(v) = s.text(key) {
                *field = v;
            }
        }
        if let Some(v) = s.number("max_features", "must be a positive integer")? {
            layers.max_features = v;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        let s = Section::new("cache", section);
        let cache = &mut config.cache;
        if let Some(v) = s.boolean("enabled")? {
            cache.enabled = v;
        }
        if let Some(v) = s.text("version") {
            cache.version = v;
        }
        if let Some(v) = s.number("memory_entries", "must be a positive integer")? {
            if v == 0 {
                return Err(s.invalid("memory_entries", "0", "must be at least 1"));
            }
            cache.memory_entries = v;
        }
        if let Some(v) = s.duration("default_ttl")? {
            cache.default_ttl = v;
        }
        if let Some(v) = s.duration("base_ttl")? {
            cache.base_ttl = v;
        }
        if let Some(v) = s.duration("query_ttl")? {
            cache.query_ttl = v;
        }
        if let Some(v) = s.text("directory") {
            cache.directory = expand_tilde(&v);
        }
        if let Some(v) = s.boolean("durable_enabled")? {
            cache.durable_enabled = v;
        }
        if let Some(v) = s.number("durable_max_entries", "must be a non-negative integer")? {
            cache.durable_max_entries = v;
        }
        if let Some(v) = s.size("max_raw_size")? {
            cache.max_raw_size = v;
        }
        if let Some(v) = s.text("fallback_file") {
            cache.fallback_file = expand_tilde(&v);
        }
        if let Some(v) = s.size("fallback_max_entry_size")? {
            cache.fallback_max_entry_size = v;
        }
        if let Some(v) = s.size("fallback_quota")? {
            cache.fallback_quota = v;
        }
    }

    // [picking] section
    if let Some(section) = ini.section(Some("picking")) {
        let s = Section::new("picking", section);
        if let Some(v) = s.positive_float("point_tolerance_m")? {
            config.picking.point_tolerance_m = v;
        }
        if let Some(v) = s.positive_float("line_tolerance_px")? {
            config.picking.line_tolerance_px = v;
        }
        if let Some(v) = s.positive_float("zoom")? {
            config.picking.zoom = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        let s = Section::new("logging", section);
        if let Some(v) = s.text("directory") {
            config.logging.directory = expand_tilde(&v);
        }
        if let Some(v) = s.text("file") {
            config.logging.file = v;
        }
    }

    Ok(config)
}

/// Typed accessors over one INI section. Empty values count as unset.
struct Section<'a> {
    name: &'static str,
    props: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, props: &'a Properties) -> Self {
        Self { name, props }
    }

    fn invalid(&self, key: &str, value: &str, reason: &str) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn text(&self, key: &str) -> Option<String> {
        self.props
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn boolean(&self, key: &str) -> Result<Option<bool>, ConfigFileError> {
        self.text(key)
            .map(|v| match v.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(self.invalid(key, &v, "must be true or false")),
            })
            .transpose()
    }

    fn number<T: FromStr>(&self, key: &str, reason: &str) -> Result<Option<T>, ConfigFileError> {
        self.text(key)
            .map(|v| v.parse().map_err(|_| self.invalid(key, &v, reason)))
            .transpose()
    }

    fn positive_float(&self, key: &str) -> Result<Option<f64>, ConfigFileError> {
        match self.number::<f64>(key, "must be a positive number")? {
            Some(v) if !(v.is_finite() && v > 0.0) => {
                Err(self.invalid(key, &v.to_string(), "must be a positive number"))
            }
            other => Ok(other),
        }
    }

    fn size(&self, key: &str) -> Result<Option<usize>, ConfigFileError> {
        self.text(key)
            .map(|v| {
                parse_size(&v).map_err(|_| {
                    self.invalid(key, &v, "expected format like '8MB', '650KB', or '1024'")
                })
            })
            .transpose()
    }

    fn duration(&self, key: &str) -> Result<Option<Duration>, ConfigFileError> {
        self.text(key)
            .map(|v| {
                parse_duration(&v).map_err(|_| {
                    self.invalid(key, &v, "expected format like '24h', '30m', '45s', or '500ms'")
                })
            })
            .transpose()
    }
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
