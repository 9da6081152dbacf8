//! Wire bodies and shared HTTP steps for the auth endpoints.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::AuthAttempt;
use crate::credentials::CredentialRecord;
use crate::descriptor::ServiceDescriptor;

/// Body of a refresh-token exchange.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    /// Current refresh token.
    pub refresh: &'a str,
}

/// Body of a username/password login.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    /// Login username.
    pub username: &'a str,
    /// Login password.
    pub password: &'a str,
}

/// Token pair returned by the refresh and login endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    /// New access token.
    pub access: String,
    /// New refresh token; absent when the service rotates only access tokens.
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Lightweight authenticated GET confirming the access token is still good.
pub(crate) async fn probe_validate(
    http: &Client,
    descriptor: &ServiceDescriptor,
    record: Option<&CredentialRecord>,
) -> AuthAttempt {
    let Some(record) = record.filter(|r| r.is_usable()) else {
        return AuthAttempt::Rejected(String::from("no stored credential"));
    };

    let url = match descriptor.base_url().join(descriptor.validate_path()) {
        Ok(url) => url,
        Err(err) => return AuthAttempt::Errored(format!("invalid validate URL: {err}")),
    };

    match http.get(url).bearer_auth(&record.access).send().await {
        Ok(response) if response.status().is_success() => AuthAttempt::Granted(None),
        Ok(response) => {
            AuthAttempt::Rejected(format!("validate returned HTTP {}", response.status()))
        }
        Err(err) => AuthAttempt::Errored(format!("validate request failed: {err}")),
    }
}

/// Full username/password login; returns a fresh credential pair on success.
pub(crate) async fn password_login(http: &Client, descriptor: &ServiceDescriptor) -> AuthAttempt {
    let (Some(username), Some(password)) = (descriptor.username(), descriptor.password()) else {
        return AuthAttempt::Rejected(String::from("username/password not configured"));
    };

    let url = match descriptor.base_url().join(descriptor.login_path()) {
        Ok(url) => url,
        Err(err) => return AuthAttempt::Errored(format!("invalid login URL: {err}")),
    };

    let body = LoginRequest { username, password };
    let response = match http.post(url).json(&body).send().await {
        Ok(response) => response,
        Err(err) => return AuthAttempt::Errored(format!("login request failed: {err}")),
    };

    let status = response.status();
    if !status.is_success() {
        return AuthAttempt::Rejected(format!("login returned HTTP {status}"));
    }

    match response.json::<TokenResponse>().await {
        Ok(token) => {
            AuthAttempt::Granted(Some(CredentialRecord::new(token.access, token.refresh)))
        }
        Err(err) => AuthAttempt::Errored(format!("failed to decode login response: {err}")),
    }
}
