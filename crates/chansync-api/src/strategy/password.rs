//! Password-only strategy (channel/EPG manager).

use anyhow::Result;
use reqwest::Client;

use super::wire;
use super::{AuthAttempt, LocalAuthStrategy};
use crate::credentials::CredentialRecord;
use crate::descriptor::ServiceDescriptor;

/// Strategy for services that only know full username/password login.
///
/// No refresh token exists; the refresh step always falls through to full
/// reauthentication.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct PasswordAuth {
    /// HTTP client with the descriptor's timeouts.
    http: Client,
    /// Service configuration.
    descriptor: ServiceDescriptor,
}

impl PasswordAuth {
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

impl LocalAuthStrategy for PasswordAuth {
    async fn validate(&self, record: Option<&CredentialRecord>) -> AuthAttempt {
        wire::probe_validate(&self.http, &self.descriptor, record).await
    }

    async fn refresh(&self, _record: Option<&CredentialRecord>) -> AuthAttempt {
        AuthAttempt::Unsupported
    }

    async fn reauthenticate(&self) -> AuthAttempt {
        wire::password_login(&self.http, &self.descriptor).await
    }
}
