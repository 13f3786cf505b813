//! Configuration for parcelview components.
//!
//! The INI file at `~/.parcelview/config.ini` is loaded into a
//! [`ConfigFile`], which hands out the typed configuration each component
//! takes: [`crate::cache::CacheConfig`] for the response cache,
//! [`crate::layers::LoaderSettings`] for district loading,
//! [`crate::pick::PickSettings`] for hit-testing.
//!
//! # Example
//!
//! ```
//! use parcelview::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let cache = config.cache_config();
//! assert_eq!(cache.memory_entries, 25);
//! ```

mod defaults;
mod duration;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use duration::{format_duration, parse_duration, DurationParseError};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use defaults::*;
pub use settings::{
    CacheSettings, ConfigFile, LayerSettings, LoggingSettings, PickingSettings, ServiceSettings,
};
pub use size::{format_size, parse_size, SizeParseError};
