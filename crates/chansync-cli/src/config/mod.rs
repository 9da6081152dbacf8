//! Application configuration module.
//!
//! Manages the TOML config file carrying per-service settings for the three
//! external integrations.

#[allow(clippy::module_inception)]
mod config;
mod paths;

#[allow(clippy::module_name_repetitions)]
pub use config::{AppConfig, ServiceConfig, ServicesConfig};
pub use paths::{resolve_config_path, resolve_data_dir};
