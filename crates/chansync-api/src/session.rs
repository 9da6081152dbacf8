//! Session state machine and the validate/refresh/reauthenticate cascade.

use anyhow::Result;
use tracing::instrument;

use crate::credentials::{CredentialRecord, CredentialStore};
use crate::descriptor::ServiceDescriptor;
use crate::freshness::FreshnessGate;
use crate::outcome::SessionError;
use crate::strategy::{AuthAttempt, LocalAuthStrategy};

/// In-memory belief about whether the current credential is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state, and the state after any configuration change.
    Unknown,
    /// The last cascade run confirmed the credential.
    Authenticated,
    /// Every recovery step was exhausted. Not terminal: the next call
    /// re-enters the cascade.
    Failed,
}

/// Per-service session owner.
///
/// Owns the freshness gate, the auth strategy, and an in-memory copy of the
/// stored credential. Every caller must go through `ensure_valid_session()`
/// before using the credential; callers share the manager behind
/// `Arc<tokio::sync::Mutex>` so only one cascade runs at a time.
#[derive(Debug)]
pub struct SessionManager<S> {
    /// Service configuration.
    descriptor: ServiceDescriptor,
    /// Auth strategy variant for this service.
    strategy: S,
    /// Credential persistence.
    store: CredentialStore,
    /// Elapsed-time re-validation gate.
    gate: FreshnessGate,
    /// Current session state.
    state: SessionState,
    /// Read copy of the stored credential.
    credential: Option<CredentialRecord>,
}

impl<S: LocalAuthStrategy> SessionManager<S> {
    /// Creates a manager and loads any stored credential for the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored credential file exists but is
    /// unreadable (store corruption aborts the run rather than silently
    /// discarding a credential).
    pub fn new(descriptor: ServiceDescriptor, strategy: S, store: CredentialStore) -> Result<Self> {
        let credential = store.load(descriptor.name())?;
        let gate = FreshnessGate::new(descriptor.freshness_threshold());
        Ok(Self {
            descriptor,
            strategy,
            store,
            gate,
            state: SessionState::Unknown,
            credential,
        })
    }

    /// Current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Service name from the descriptor.
    #[must_use]
    pub fn service(&self) -> &str {
        self.descriptor.name()
    }

    /// Access token to attach to requests, if one is held.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.credential
            .as_ref()
            .filter(|r| r.is_usable())
            .map(|r| r.access.clone())
    }

    /// Forces the session back to `Unknown` and the gate stale.
    ///
    /// Hook for external changes the cached state cannot survive: a settings
    /// reload, or a 401 that contradicts a fresh-looking gate.
    pub fn invalidate(&mut self, reason: &str) {
        tracing::info!(service = self.descriptor.name(), reason, "session invalidated");
        self.state = SessionState::Unknown;
        self.gate.force_stale();
    }

    /// Guarantees a valid credential before any call, or says why there is none.
    ///
    /// Cascade: fast path on a fresh gate, then validate, then refresh, then
    /// full reauthentication. A transport error at any step fails that step
    /// and proceeds to the next. On total failure the gate is reset so the
    /// next call re-enters the cascade.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Disabled`] / [`SessionError::Unconfigured`] before
    ///   any network call.
    /// - [`SessionError::AuthFailed`] when every step was exhausted.
    #[instrument(skip_all, fields(service = self.descriptor.name()))]
    pub async fn ensure_valid_session(&mut self) -> std::result::Result<(), SessionError> {
        if !self.gate.needs_check() {
            return Ok(());
        }
        // Stamp before any network round-trip so rapid successive callers do
        // not each decide "stale" and start their own cascade.
        self.gate.mark_checked_now();

        if !self.descriptor.is_enabled() {
            self.gate.force_stale();
            return Err(SessionError::Disabled);
        }
        if let Err(missing) = self.descriptor.check_configured() {
            self.gate.force_stale();
            return Err(SessionError::Unconfigured(missing));
        }

        match self.strategy.validate(self.credential.as_ref()).await {
            AuthAttempt::Granted(_) => {
                tracing::debug!("session validated");
                self.state = SessionState::Authenticated;
                return Ok(());
            }
            attempt => self.log_step("validate", &attempt),
        }

        match self.strategy.refresh(self.credential.as_ref()).await {
            AuthAttempt::Granted(record) => {
                tracing::info!("session refreshed");
                self.adopt(record);
                return Ok(());
            }
            attempt => self.log_step("refresh", &attempt),
        }

        match self.strategy.reauthenticate().await {
            AuthAttempt::Granted(record) => {
                tracing::info!("session re-authenticated");
                self.adopt(record);
                return Ok(());
            }
            attempt => self.log_step("reauthenticate", &attempt),
        }

        self.state = SessionState::Failed;
        // Failed is re-enterable: a fresh-looking gate must not mask it.
        self.gate.force_stale();
        Err(SessionError::AuthFailed {
            service: String::from(self.descriptor.name()),
        })
    }

    /// Adopts a granted credential: persist (best effort), keep in memory.
    fn adopt(&mut self, record: Option<CredentialRecord>) {
        if let Some(record) = record {
            if let Err(err) = self.store.save(self.descriptor.name(), &record) {
                // Not fatal: the in-memory credential is valid for this run.
                tracing::warn!(
                    service = self.descriptor.name(),
                    error = %err,
                    "credential obtained but not persisted"
                );
            }
            self.credential = Some(record);
        }
        self.state = SessionState::Authenticated;
    }

    /// Logs one non-granting cascade step outcome.
    fn log_step(&self, step: &str, attempt: &AuthAttempt) {
        match attempt {
            AuthAttempt::Unsupported => tracing::debug!(step, "step not supported, falling through"),
            AuthAttempt::Rejected(reason) => tracing::debug!(step, reason = %reason, "step rejected"),
            AuthAttempt::Errored(reason) => tracing::warn!(step, reason = %reason, "step failed"),
            AuthAttempt::Granted(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    use super::*;
    use crate::descriptor::AuthKind;

    /// Scripted strategy recording how often each step ran.
    #[derive(Debug)]
    struct StubStrategy {
        validate_result: RefCell<AuthAttempt>,
        refresh_result: RefCell<AuthAttempt>,
        reauth_result: RefCell<AuthAttempt>,
        validate_calls: Cell<usize>,
        refresh_calls: Cell<usize>,
        reauth_calls: Cell<usize>,
    }

    impl StubStrategy {
        fn new(validate: AuthAttempt, refresh: AuthAttempt, reauth: AuthAttempt) -> Self {
            Self {
                validate_result: RefCell::new(validate),
                refresh_result: RefCell::new(refresh),
                reauth_result: RefCell::new(reauth),
                validate_calls: Cell::new(0),
                refresh_calls: Cell::new(0),
                reauth_calls: Cell::new(0),
            }
        }
    }

    impl LocalAuthStrategy for StubStrategy {
        async fn validate(&self, _record: Option<&CredentialRecord>) -> AuthAttempt {
            self.validate_calls.set(self.validate_calls.get() + 1);
            self.validate_result.borrow().clone()
        }

        async fn refresh(&self, _record: Option<&CredentialRecord>) -> AuthAttempt {
            self.refresh_calls.set(self.refresh_calls.get() + 1);
            self.refresh_result.borrow().clone()
        }

        async fn reauthenticate(&self) -> AuthAttempt {
            self.reauth_calls.set(self.reauth_calls.get() + 1);
            self.reauth_result.borrow().clone()
        }
    }

    fn descriptor(threshold: Duration) -> ServiceDescriptor {
        ServiceDescriptor::builder()
            .name("epg")
            .base_url("http://localhost:8089/".parse().unwrap())
            .auth(AuthKind::Password)
            .username("admin")
            .password("secret")
            .freshness_threshold(threshold)
            .build()
            .unwrap()
    }

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        (dir, store)
    }

    fn rejected() -> AuthAttempt {
        AuthAttempt::Rejected(String::from("nope"))
    }

    #[tokio::test]
    async fn test_fresh_gate_skips_network_entirely() {
        // Arrange
        let strategy = StubStrategy::new(AuthAttempt::Granted(None), rejected(), rejected());
        let (_dir, store) = store();
        let mut session =
            SessionManager::new(descriptor(Duration::from_secs(60)), strategy, store).unwrap();

        // Act: rapid successive calls within the threshold
        session.ensure_valid_session().await.unwrap();
        session.ensure_valid_session().await.unwrap();
        session.ensure_valid_session().await.unwrap();

        // Assert: at most one validate attempt
        assert_eq!(session.strategy.validate_calls.get(), 1);
        assert_eq!(session.strategy.refresh_calls.get(), 0);
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_validate_fail_refresh_success_persists_record() {
        // Arrange
        let refreshed = CredentialRecord::new("new-access", Some(String::from("ref-token")));
        let strategy = StubStrategy::new(
            rejected(),
            AuthAttempt::Granted(Some(refreshed)),
            rejected(),
        );
        let (_dir, cred_store) = store();
        let mut session =
            SessionManager::new(descriptor(Duration::from_secs(60)), strategy, cred_store.clone())
                .unwrap();

        // Act
        session.ensure_valid_session().await.unwrap();

        // Assert
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.strategy.reauth_calls.get(), 0);
        let persisted = cred_store.load("epg").unwrap().unwrap();
        assert_eq!(persisted.access, "new-access");
        assert_eq!(persisted.refresh.as_deref(), Some("ref-token"));
    }

    #[tokio::test]
    async fn test_full_cascade_failure_leaves_store_untouched() {
        // Arrange
        let strategy = StubStrategy::new(
            rejected(),
            AuthAttempt::Errored(String::from("connect refused")),
            rejected(),
        );
        let (_dir, cred_store) = store();
        let mut session =
            SessionManager::new(descriptor(Duration::from_secs(60)), strategy, cred_store.clone())
                .unwrap();

        // Act
        let result = session.ensure_valid_session().await;

        // Assert
        assert_eq!(
            result,
            Err(SessionError::AuthFailed {
                service: String::from("epg")
            })
        );
        assert_eq!(session.state(), SessionState::Failed);
        assert!(cred_store.load("epg").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_state_is_reentered_on_next_call() {
        // Arrange
        let strategy = StubStrategy::new(rejected(), AuthAttempt::Unsupported, rejected());
        let (_dir, cred_store) = store();
        let mut session =
            SessionManager::new(descriptor(Duration::from_secs(3600)), strategy, cred_store)
                .unwrap();

        // Act: failure must not leave a fresh-looking gate behind
        let first = session.ensure_valid_session().await;
        let second = session.ensure_valid_session().await;

        // Assert: both calls ran the cascade
        assert!(first.is_err());
        assert!(second.is_err());
        assert_eq!(session.strategy.validate_calls.get(), 2);
        assert_eq!(session.strategy.reauth_calls.get(), 2);
    }

    #[tokio::test]
    async fn test_reauth_only_skips_refresh_to_full_login() {
        // Arrange: no refresh token stored anywhere, refresh unsupported
        let fresh = CredentialRecord::new("session-token", None);
        let strategy = StubStrategy::new(
            rejected(),
            AuthAttempt::Unsupported,
            AuthAttempt::Granted(Some(fresh)),
        );
        let (_dir, cred_store) = store();
        let mut session =
            SessionManager::new(descriptor(Duration::from_secs(60)), strategy, cred_store)
                .unwrap();

        // Act
        session.ensure_valid_session().await.unwrap();

        // Assert
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.strategy.reauth_calls.get(), 1);
        assert_eq!(session.access_token(), Some(String::from("session-token")));
    }

    #[tokio::test]
    async fn test_disabled_service_fails_fast_without_strategy_calls() {
        // Arrange
        let strategy = StubStrategy::new(AuthAttempt::Granted(None), rejected(), rejected());
        let (_dir, cred_store) = store();
        let disabled = ServiceDescriptor::builder()
            .name("epg")
            .base_url("http://localhost:8089/".parse().unwrap())
            .auth(AuthKind::Password)
            .username("admin")
            .password("secret")
            .enabled(false)
            .build()
            .unwrap();
        let mut session = SessionManager::new(disabled, strategy, cred_store).unwrap();

        // Act
        let result = session.ensure_valid_session().await;

        // Assert
        assert_eq!(result, Err(SessionError::Disabled));
        assert_eq!(session.strategy.validate_calls.get(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_service_names_missing_setting() {
        // Arrange
        let strategy = StubStrategy::new(AuthAttempt::Granted(None), rejected(), rejected());
        let (_dir, cred_store) = store();
        let unconfigured = ServiceDescriptor::builder()
            .name("media")
            .base_url("http://localhost:8096/".parse().unwrap())
            .auth(AuthKind::Refresh)
            .build()
            .unwrap();
        let mut session = SessionManager::new(unconfigured, strategy, cred_store).unwrap();

        // Act
        let result = session.ensure_valid_session().await;

        // Assert
        assert_eq!(
            result,
            Err(SessionError::Unconfigured(String::from("username")))
        );
    }

    #[tokio::test]
    async fn test_invalidate_forces_recheck() {
        // Arrange
        let strategy = StubStrategy::new(AuthAttempt::Granted(None), rejected(), rejected());
        let (_dir, cred_store) = store();
        let mut session =
            SessionManager::new(descriptor(Duration::from_secs(3600)), strategy, cred_store)
                .unwrap();
        session.ensure_valid_session().await.unwrap();

        // Act
        session.invalidate("settings changed");
        session.ensure_valid_session().await.unwrap();

        // Assert
        assert_eq!(session.strategy.validate_calls.get(), 2);
    }

    #[tokio::test]
    async fn test_stored_credential_is_loaded_at_construction() {
        // Arrange
        let (_dir, cred_store) = store();
        cred_store
            .save("epg", &CredentialRecord::new("stored-token", None))
            .unwrap();
        let strategy = StubStrategy::new(AuthAttempt::Granted(None), rejected(), rejected());

        // Act
        let session =
            SessionManager::new(descriptor(Duration::from_secs(60)), strategy, cred_store)
                .unwrap();

        // Assert
        assert_eq!(session.access_token(), Some(String::from("stored-token")));
    }
}
