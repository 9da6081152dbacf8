//! `AppConfig` struct and TOML read/write.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use chansync_api::descriptor::{AuthKind, ServiceDescriptor};

/// Default freshness threshold in seconds.
const fn default_freshness_seconds() -> u64 {
    30
}

/// Top-level application configuration.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// External service settings.
    #[serde(default)]
    pub services: ServicesConfig,
}

/// Settings for the three external integrations.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ServicesConfig {
    /// Channel/EPG manager (username/password login only).
    #[serde(default)]
    pub epg: ServiceConfig,
    /// Media server (refresh-token rotation).
    #[serde(default)]
    pub media: ServiceConfig,
    /// Read-only direct-search API (no auth).
    #[serde(default)]
    pub lookup: ServiceConfig,
}

/// Settings for one external service.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Whether the integration is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the service.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Login username.
    #[serde(default)]
    pub username: Option<String>,
    /// Login password.
    #[serde(default)]
    pub password: Option<String>,
    /// Seconds a confirmed session is trusted without re-validation.
    #[serde(default = "default_freshness_seconds")]
    pub freshness_threshold_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            username: None,
            password: None,
            freshness_threshold_seconds: default_freshness_seconds(),
        }
    }
}

impl ServiceConfig {
    /// Builds the immutable descriptor for this service.
    ///
    /// Returns `Ok(None)` if no base URL is set (service never configured).
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse.
    pub fn descriptor(&self, name: &str, auth: AuthKind) -> Result<Option<ServiceDescriptor>> {
        let Some(base_url) = self.base_url.as_deref() else {
            return Ok(None);
        };
        let base_url = base_url
            .parse()
            .with_context(|| format!("invalid base_url for service {name}"))?;

        let mut builder = ServiceDescriptor::builder()
            .name(name)
            .base_url(base_url)
            .auth(auth)
            .enabled(self.enabled)
            .freshness_threshold(Duration::from_secs(self.freshness_threshold_seconds));
        if let Some(username) = &self.username {
            builder = builder.username(username);
        }
        if let Some(password) = &self.password {
            builder = builder.password(password);
        }
        builder.build().map(Some)
    }
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Saves config to a TOML file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config to TOML")?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }
}
