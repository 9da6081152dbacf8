//! Refresh-capable strategy (media server).

use anyhow::Result;
use reqwest::Client;

use super::wire::{self, RefreshRequest, TokenResponse};
use super::{AuthAttempt, LocalAuthStrategy};
use crate::credentials::CredentialRecord;
use crate::descriptor::ServiceDescriptor;

/// Strategy for services with refresh-token rotation.
///
/// All three cascade steps exist: validate probes with the current access
/// token, refresh exchanges the refresh token for a new access token, and
/// reauthenticate performs a full login.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct RefreshAuth {
    /// HTTP client with the descriptor's timeouts.
    http: Client,
    /// Service configuration.
    descriptor: ServiceDescriptor,
}

impl RefreshAuth {
    /// Creates a strategy for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client build fails.
    pub fn new(descriptor: ServiceDescriptor) -> Result<Self> {
        let http = descriptor.http_client()?;
        Ok(Self { http, descriptor })
    }
}

impl LocalAuthStrategy for RefreshAuth {
    async fn validate(&self, record: Option<&CredentialRecord>) -> AuthAttempt {
        wire::probe_validate(&self.http, &self.descriptor, record).await
    }

    async fn refresh(&self, record: Option<&CredentialRecord>) -> AuthAttempt {
        let Some(record) = record else {
            return AuthAttempt::Rejected(String::from("no stored credential"));
        };
        let Some(refresh_token) = record.refresh.as_deref().filter(|t| !t.is_empty()) else {
            return AuthAttempt::Rejected(String::from("no refresh token stored"));
        };

        let url = match self.descriptor.base_url().join(self.descriptor.refresh_path()) {
            Ok(url) => url,
            Err(err) => return AuthAttempt::Errored(format!("invalid refresh URL: {err}")),
        };

        let body = RefreshRequest {
            refresh: refresh_token,
        };
        let response = match self.http.post(url).json(&body).send().await {
            Ok(response) => response,
            Err(err) => return AuthAttempt::Errored(format!("refresh request failed: {err}")),
        };

        let status = response.status();
        if !status.is_success() {
            return AuthAttempt::Rejected(format!("refresh returned HTTP {status}"));
        }

        match response.json::<TokenResponse>().await {
            Ok(token) => {
                // Keep the stored refresh token when the service rotates only
                // the access half.
                let refresh = token
                    .refresh
                    .or_else(|| Some(String::from(refresh_token)));
                AuthAttempt::Granted(Some(CredentialRecord::new(token.access, refresh)))
            }
            Err(err) => AuthAttempt::Errored(format!("failed to decode refresh response: {err}")),
        }
    }

    async fn reauthenticate(&self) -> AuthAttempt {
        wire::password_login(&self.http, &self.descriptor).await
    }
}
