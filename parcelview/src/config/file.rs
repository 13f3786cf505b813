//! Configuration file handling for ~/.parcelview/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::ConfigFile;

use crate::cache::{CacheConfig, DurableTierConfig, FallbackTierConfig, KeyConfig};
use crate::fetch::WfsService;
use crate::layers::{LoaderSettings, SearchFields};
use crate::pick::PickSettings;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.parcelview/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.parcelview/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_ini_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// The commented INI text `save_to` writes.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Feature service endpoint.
    pub fn wfs_service(&self) -> WfsService {
        WfsService {
            base_url: self.service.base_url.clone(),
            workspace: self.service.workspace.clone(),
            version: self.service.version.clone(),
            srs_name: self.service.srs_name.clone(),
        }
    }

    /// Response cache configuration.
    pub fn cache_config(&self) -> CacheConfig {
        let cache = &self.cache;
        CacheConfig {
            enabled: cache.enabled,
            key: KeyConfig {
                version: cache.version.clone(),
                ..KeyConfig::default()
            },
            memory_entries: cache.memory_entries,
            default_ttl: cache.default_ttl,
            durable: DurableTierConfig {
                enabled: cache.durable_enabled,
                directory: cache.directory.clone(),
                max_entries: cache.durable_max_entries,
                max_raw_bytes: cache.max_raw_size,
            },
            fallback: FallbackTierConfig {
                file: cache.fallback_file.clone(),
                max_entry_bytes: cache.fallback_max_entry_size,
                quota_bytes: cache.fallback_quota,
            },
        }
    }

    /// District base loader settings.
    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            service: self.wfs_service(),
            building_layer: self.layers.building.clone(),
            lot_layer: self.layers.lot.clone(),
            block_layer: self.layers.block.clone(),
            district_field: self.layers.district_field.clone(),
            max_features: self.layers.max_features,
            base_ttl: self.cache.base_ttl,
            query_ttl: self.cache.query_ttl,
        }
    }

    /// Hit-test tolerances.
    pub fn pick_settings(&self) -> PickSettings {
        PickSettings {
            point_tolerance_m: self.picking.point_tolerance_m,
            line_tolerance_px: self.picking.line_tolerance_px,
            zoom: self.picking.zoom,
        }
    }

    /// Searchable code fields.
    pub fn search_fields(&self) -> SearchFields {
        SearchFields {
            district: self.layers.district_field.clone(),
            sector: self.layers.sector_field.clone(),
            block: self.layers.block_code_field.clone(),
            lot: self.layers.lot_code_field.clone(),
        }
    }
}

/// Get the path to the config directory (~/.parcelview).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parcelview")
}

/// Get the path to the config file (~/.parcelview/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
