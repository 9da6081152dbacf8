//! Authentication strategies.
//!
//! One trait, three implementations: the channel/EPG manager only knows full
//! username/password login, the media server rotates refresh tokens, and the
//! direct-search API takes no credential at all. The session cascade is
//! written once against the trait instead of per service.

#![allow(clippy::future_not_send)]

mod noauth;
mod password;
mod refresh;
mod wire;

pub use noauth::NoAuth;
pub use password::PasswordAuth;
pub use refresh::RefreshAuth;

use crate::credentials::CredentialRecord;

/// Outcome of one cascade step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAttempt {
    /// Step succeeded. `Some(record)` carries a new credential to persist;
    /// `None` means the existing credential (or no credential) stays valid.
    Granted(Option<CredentialRecord>),
    /// This strategy does not implement the step; fall through to the next.
    Unsupported,
    /// The remote service rejected the step.
    Rejected(String),
    /// Transport-level failure; the step is treated as failed, not a crash.
    Errored(String),
}

/// Authentication strategy for one service.
///
/// Abstracted as a trait for mock substitution in session tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[trait_variant::make(AuthStrategy: Send)]
pub trait LocalAuthStrategy {
    /// Cheap probe confirming the current credential is still accepted.
    async fn validate(&self, record: Option<&CredentialRecord>) -> AuthAttempt;

    /// Exchanges the refresh token for a new access token.
    async fn refresh(&self, record: Option<&CredentialRecord>) -> AuthAttempt;

    /// Full username/password login; the most expensive step, last resort.
    async fn reauthenticate(&self) -> AuthAttempt;
}
