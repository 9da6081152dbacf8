//! HTTP request execution and outcome classification.

use std::sync::Arc;

use anyhow::Result;
use reqwest::{Client, Method};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::descriptor::ServiceDescriptor;
use crate::outcome::{FailureKind, RequestOutcome};
use crate::session::SessionManager;
use crate::strategy::LocalAuthStrategy;

/// Issues one HTTP call per invocation through the session manager.
///
/// Every call passes `ensure_valid_session()` first; no call site can skip
/// the freshness/cascade logic.
#[derive(Debug)]
pub struct RequestExecutor<S> {
    /// HTTP client with the descriptor's connect/total timeouts.
    http: Client,
    /// Base URL all request paths are joined against.
    base_url: url::Url,
    /// Shared session owner (single-flight cascade).
    session: Arc<Mutex<SessionManager<S>>>,
}

impl<S: LocalAuthStrategy> RequestExecutor<S> {
    /// Creates an executor for `descriptor` over a shared session manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client build fails.
    pub fn new(
        descriptor: &ServiceDescriptor,
        session: Arc<Mutex<SessionManager<S>>>,
    ) -> Result<Self> {
        Ok(Self {
            http: descriptor.http_client()?,
            base_url: descriptor.base_url().clone(),
            session,
        })
    }

    /// Shared session manager handle.
    #[must_use]
    pub fn session(&self) -> Arc<Mutex<SessionManager<S>>> {
        Arc::clone(&self.session)
    }

    /// Executes one request and classifies the response.
    ///
    /// Session failures return `AuthExpired` without touching the network.
    /// A 401 additionally invalidates the session so the next caller
    /// re-enters the cascade instead of trusting a contradicted gate.
    #[instrument(skip_all, fields(method = %method, path))]
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> RequestOutcome {
        let token = {
            let mut session = self.session.lock().await;
            if let Err(err) = session.ensure_valid_session().await {
                tracing::warn!(error = %err, "no valid session; request not attempted");
                return RequestOutcome::Failure(FailureKind::AuthExpired);
            }
            session.access_token()
        };

        let url = match self.base_url.join(path) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(error = %err, "failed to join request URL");
                return RequestOutcome::Failure(FailureKind::Network);
            }
        };

        let mut request = self.http.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "transport failure");
                return RequestOutcome::Failure(FailureKind::Network);
            }
        };

        match response.status().as_u16() {
            200 | 201 | 204 => match response.text().await {
                Ok(text) => RequestOutcome::Success(text),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read response body");
                    RequestOutcome::Failure(FailureKind::Network)
                }
            },
            401 => {
                // The server just contradicted our cached "fresh" flag.
                self.session.lock().await.invalidate("server returned 401");
                RequestOutcome::Failure(FailureKind::AuthExpired)
            }
            403 => RequestOutcome::Failure(FailureKind::Forbidden),
            404 => RequestOutcome::Failure(FailureKind::NotFound),
            code => RequestOutcome::Failure(FailureKind::ServerError(code)),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use super::*;
    use crate::credentials::{CredentialRecord, CredentialStore};
    use crate::descriptor::AuthKind;
    use crate::strategy::{NoAuth, PasswordAuth};

    fn anonymous_descriptor(base: &str) -> ServiceDescriptor {
        ServiceDescriptor::builder()
            .name("lookup")
            .base_url(base.parse().unwrap())
            .auth(AuthKind::Anonymous)
            .build()
            .unwrap()
    }

    fn anonymous_executor(base: &str) -> RequestExecutor<NoAuth> {
        let descriptor = anonymous_descriptor(base);
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let session = SessionManager::new(descriptor.clone(), NoAuth, store).unwrap();
        RequestExecutor::new(&descriptor, Arc::new(Mutex::new(session))).unwrap()
    }

    #[tokio::test]
    async fn test_success_returns_body_verbatim() {
        // Arrange
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/stations/42"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string(r#"{"id":42}"#),
            )
            .mount(&server)
            .await;
        let executor = anonymous_executor(&format!("{}/", server.uri()));

        // Act
        let outcome = executor.execute(Method::GET, "stations/42", None).await;

        // Assert
        assert_eq!(outcome, RequestOutcome::Success(String::from(r#"{"id":42}"#)));
    }

    #[tokio::test]
    async fn test_status_classification() {
        // Arrange
        let server = wiremock::MockServer::start().await;
        for (path, status) in [("forbidden", 403), ("missing", 404), ("broken", 502)] {
            wiremock::Mock::given(wiremock::matchers::method("GET"))
                .and(wiremock::matchers::path(format!("/{path}")))
                .respond_with(wiremock::ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }
        let executor = anonymous_executor(&format!("{}/", server.uri()));

        // Act & Assert
        assert_eq!(
            executor.execute(Method::GET, "forbidden", None).await,
            RequestOutcome::Failure(FailureKind::Forbidden)
        );
        assert_eq!(
            executor.execute(Method::GET, "missing", None).await,
            RequestOutcome::Failure(FailureKind::NotFound)
        );
        assert_eq!(
            executor.execute(Method::GET, "broken", None).await,
            RequestOutcome::Failure(FailureKind::ServerError(502))
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_network() {
        // Arrange: nothing listens on this port
        let executor = anonymous_executor("http://127.0.0.1:9/");

        // Act
        let outcome = executor.execute(Method::GET, "stations", None).await;

        // Assert
        assert_eq!(outcome, RequestOutcome::Failure(FailureKind::Network));
    }

    #[tokio::test]
    async fn test_session_failure_skips_network_call() {
        // Arrange: password login always rejected, so no session exists
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/auth/login"))
            .respond_with(wiremock::ResponseTemplate::new(401))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("PATCH"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let descriptor = ServiceDescriptor::builder()
            .name("epg")
            .base_url(format!("{}/", server.uri()).parse().unwrap())
            .auth(AuthKind::Password)
            .username("admin")
            .password("wrong")
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let strategy = PasswordAuth::new(descriptor.clone()).unwrap();
        let session = SessionManager::new(descriptor.clone(), strategy, store).unwrap();
        let executor = RequestExecutor::new(&descriptor, Arc::new(Mutex::new(session))).unwrap();

        // Act
        let outcome = executor.execute(Method::PATCH, "stations/1", None).await;

        // Assert
        assert_eq!(outcome, RequestOutcome::Failure(FailureKind::AuthExpired));
    }

    #[tokio::test]
    async fn test_401_forces_cascade_reentry_on_next_call() {
        // Arrange: validate always passes, resource always answers 401
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/system/status"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("PATCH"))
            .and(wiremock::matchers::path("/stations/1"))
            .respond_with(wiremock::ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let descriptor = ServiceDescriptor::builder()
            .name("epg")
            .base_url(format!("{}/", server.uri()).parse().unwrap())
            .auth(AuthKind::Password)
            .username("admin")
            .password("secret")
            .freshness_threshold(Duration::from_secs(3600))
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store
            .save("epg", &CredentialRecord::new("acc-token", None))
            .unwrap();
        let strategy = PasswordAuth::new(descriptor.clone()).unwrap();
        let session = SessionManager::new(descriptor.clone(), strategy, store).unwrap();
        let executor = RequestExecutor::new(&descriptor, Arc::new(Mutex::new(session))).unwrap();

        // Act: the long threshold would normally make the second call skip the
        // probe; the 401 on the first call must override that.
        let first = executor.execute(Method::PATCH, "stations/1", None).await;
        let second = executor.execute(Method::PATCH, "stations/1", None).await;

        // Assert (mock expect(2) verifies the second validate probe ran)
        assert_eq!(first, RequestOutcome::Failure(FailureKind::AuthExpired));
        assert_eq!(second, RequestOutcome::Failure(FailureKind::AuthExpired));
    }

    #[tokio::test]
    async fn test_bearer_token_attached_when_held() {
        // Arrange
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/system/status"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/stations"))
            .and(wiremock::matchers::header(
                "Authorization",
                "Bearer acc-token",
            ))
            .respond_with(wiremock::ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        let descriptor = ServiceDescriptor::builder()
            .name("epg")
            .base_url(format!("{}/", server.uri()).parse().unwrap())
            .auth(AuthKind::Password)
            .username("admin")
            .password("secret")
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store
            .save("epg", &CredentialRecord::new("acc-token", None))
            .unwrap();
        let strategy = PasswordAuth::new(descriptor.clone()).unwrap();
        let session = SessionManager::new(descriptor.clone(), strategy, store).unwrap();
        let executor = RequestExecutor::new(&descriptor, Arc::new(Mutex::new(session))).unwrap();

        // Act
        let outcome = executor
            .execute(
                Method::POST,
                "stations",
                Some(&serde_json::json!({"name": "KEXP"})),
            )
            .await;

        // Assert
        assert!(outcome.is_success());
    }
}
