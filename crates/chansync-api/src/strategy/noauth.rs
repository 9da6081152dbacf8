//! Anonymous strategy (read-only direct-search API).

use super::{AuthAttempt, LocalAuthStrategy};
use crate::credentials::CredentialRecord;

/// Strategy for services without authentication.
///
/// Validation succeeds trivially and no credential is ever attached to
/// requests, so the cascade never proceeds past the first step.
#[derive(Debug, Default, Clone, Copy)]
#[allow(clippy::module_name_repetitions)]
pub struct NoAuth;

impl LocalAuthStrategy for NoAuth {
    async fn validate(&self, _record: Option<&CredentialRecord>) -> AuthAttempt {
        AuthAttempt::Granted(None)
    }

    async fn refresh(&self, _record: Option<&CredentialRecord>) -> AuthAttempt {
        AuthAttempt::Unsupported
    }

    async fn reauthenticate(&self) -> AuthAttempt {
        AuthAttempt::Unsupported
    }
}
