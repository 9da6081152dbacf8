//! Session layer for chansync external integrations.
//!
//! Keeps a bearer credential valid across an unbounded sequence of calls to a
//! remote service (channel/EPG manager, media server, or read-only lookup API)
//! and classifies every request outcome for the callers above it.

/// Credential record persistence (one JSON document per service).
pub mod credentials;
/// Per-integration immutable configuration.
pub mod descriptor;
/// HTTP request execution and outcome classification.
pub mod executor;
/// Elapsed-time gate deciding when a session needs re-validation.
pub mod freshness;
/// Typed request/session outcomes.
pub mod outcome;
/// Session state machine and the validate/refresh/reauthenticate cascade.
pub mod session;
/// Authentication strategies (refresh-capable, password-only, anonymous).
pub mod strategy;

pub use credentials::{CredentialRecord, CredentialStore};
pub use descriptor::{AuthKind, ServiceDescriptor, ServiceDescriptorBuilder};
pub use executor::RequestExecutor;
pub use freshness::FreshnessGate;
pub use outcome::{FailureKind, RequestOutcome, SessionError};
pub use session::{SessionManager, SessionState};
pub use strategy::{AuthAttempt, AuthStrategy, LocalAuthStrategy, NoAuth, PasswordAuth, RefreshAuth};
