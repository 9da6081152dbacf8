//! Per-integration immutable configuration.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use url::Url;

use super::freshness;

/// Default validate probe path (lightweight authenticated GET).
const DEFAULT_VALIDATE_PATH: &str = "system/status";

/// Default refresh-token exchange path.
const DEFAULT_REFRESH_PATH: &str = "auth/refresh";

/// Default username/password login path.
const DEFAULT_LOGIN_PATH: &str = "auth/login";

/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default total request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which authentication flow a service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    /// Access token refreshed via a refresh token; full login as last resort.
    Refresh,
    /// Username/password login only; no refresh token exists.
    Password,
    /// No authentication; no credential is ever attached.
    Anonymous,
}

/// Immutable per-integration configuration.
///
/// Supplied wholesale by the settings layer; the session core never mutates
/// it. Any external settings change must rebuild the descriptor and
/// invalidate the session.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    name: String,
    base_url: Url,
    enabled: bool,
    username: Option<String>,
    password: Option<String>,
    auth: AuthKind,
    freshness_threshold: Duration,
    validate_path: String,
    refresh_path: String,
    login_path: String,
    connect_timeout: Duration,
    request_timeout: Duration,
}

/// Builder for `ServiceDescriptor`.
#[derive(Debug)]
pub struct ServiceDescriptorBuilder {
    name: Option<String>,
    base_url: Option<Url>,
    enabled: bool,
    username: Option<String>,
    password: Option<String>,
    auth: Option<AuthKind>,
    freshness_threshold: Option<Duration>,
    validate_path: Option<String>,
    refresh_path: Option<String>,
    login_path: Option<String>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl ServiceDescriptorBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            name: None,
            base_url: None,
            enabled: true,
            username: None,
            password: None,
            auth: None,
            freshness_threshold: None,
            validate_path: None,
            refresh_path: None,
            login_path: None,
            connect_timeout: None,
            request_timeout: None,
        }
    }

    /// Sets the service name (required).
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the base URL (required).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the enabled flag (default: true).
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the login username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the login password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the auth flow (required).
    #[must_use]
    pub const fn auth(mut self, auth: AuthKind) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets the freshness threshold (default: 30s).
    #[must_use]
    pub const fn freshness_threshold(mut self, threshold: Duration) -> Self {
        self.freshness_threshold = Some(threshold);
        self
    }

    /// Overrides the validate probe path.
    #[must_use]
    pub fn validate_path(mut self, path: impl Into<String>) -> Self {
        self.validate_path = Some(path.into());
        self
    }

    /// Overrides the refresh-token exchange path.
    #[must_use]
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Overrides the username/password login path.
    #[must_use]
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    /// Sets the connect timeout (default: 10s).
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the total request timeout (default: 30s).
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the descriptor.
    ///
    /// # Errors
    ///
    /// - `name` is not set.
    /// - `base_url` is not set.
    /// - `auth` is not set.
    pub fn build(self) -> Result<ServiceDescriptor> {
        let name = self.name.context("name is required")?;
        let base_url = self.base_url.context("base_url is required")?;
        let auth = self.auth.context("auth is required")?;

        Ok(ServiceDescriptor {
            name,
            base_url,
            enabled: self.enabled,
            username: self.username,
            password: self.password,
            auth,
            freshness_threshold: self
                .freshness_threshold
                .unwrap_or(freshness::DEFAULT_THRESHOLD),
            validate_path: self
                .validate_path
                .unwrap_or_else(|| String::from(DEFAULT_VALIDATE_PATH)),
            refresh_path: self
                .refresh_path
                .unwrap_or_else(|| String::from(DEFAULT_REFRESH_PATH)),
            login_path: self
                .login_path
                .unwrap_or_else(|| String::from(DEFAULT_LOGIN_PATH)),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        })
    }
}

impl ServiceDescriptor {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> ServiceDescriptorBuilder {
        ServiceDescriptorBuilder::new()
    }

    /// Service name (also the credential file stem).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL all paths are joined against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether the integration is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Login username, if configured.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Login password, if configured.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Auth flow this service speaks.
    #[must_use]
    pub const fn auth(&self) -> AuthKind {
        self.auth
    }

    /// Seconds a confirmed session is trusted.
    #[must_use]
    pub const fn freshness_threshold(&self) -> Duration {
        self.freshness_threshold
    }

    /// Validate probe path.
    #[must_use]
    pub fn validate_path(&self) -> &str {
        &self.validate_path
    }

    /// Refresh-token exchange path.
    #[must_use]
    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    /// Username/password login path.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Checks that the settings required by the auth flow are present.
    ///
    /// # Errors
    ///
    /// Returns the name of the missing setting.
    pub fn check_configured(&self) -> std::result::Result<(), String> {
        match self.auth {
            AuthKind::Anonymous => Ok(()),
            AuthKind::Refresh | AuthKind::Password => {
                if self.username.as_deref().is_none_or(str::is_empty) {
                    return Err(String::from("username"));
                }
                if self.password.as_deref().is_none_or(str::is_empty) {
                    return Err(String::from("password"));
                }
                Ok(())
            }
        }
    }

    /// Builds an HTTP client with this descriptor's timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the `reqwest::Client` build fails.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .gzip(true)
            .build()
            .context("failed to build HTTP client")
    }
}
