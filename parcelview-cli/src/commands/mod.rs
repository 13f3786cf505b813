//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`area`] - Polygon area and path length
//! - [`cache`] - Cache management (clear, stats)
//! - [`config`] - Configuration management (init, show, path)
//! - [`fetch`] - Single layer request through the cache
//! - [`pick`] - Feature under a map click
//! - [`search`] - Block and lot search by code

pub mod area;
pub mod cache;
pub mod common;
pub mod config;
pub mod fetch;
pub mod pick;
pub mod search;
