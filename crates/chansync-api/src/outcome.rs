//! Typed outcomes shared across the session layer.

use thiserror::Error;

/// Result of one executed HTTP request.
///
/// This is the unit the batch executor counts; the body is returned verbatim
/// and further parsing is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 2xx response (200/201/204).
    Success(String),
    /// Everything else, classified.
    Failure(FailureKind),
}

impl RequestOutcome {
    /// Returns `true` for a 2xx outcome.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Classification of a failed request.
///
/// Callers decide retry/skip/abort from this alone: `AuthExpired` means the
/// next call re-enters the auth cascade, `Forbidden` is a permissions problem
/// and is never retried, `Network` is a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// DNS / connect / timeout failure before any HTTP status was received.
    Network,
    /// Server no longer accepts our credential (HTTP 401), or no valid
    /// session could be established.
    AuthExpired,
    /// HTTP 403.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// Any other non-2xx status.
    ServerError(u16),
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network error"),
            Self::AuthExpired => write!(f, "authentication expired"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not found"),
            Self::ServerError(code) => write!(f, "server error (HTTP {code})"),
        }
    }
}

/// Failure of `ensure_valid_session()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The integration is disabled in the settings.
    #[error("integration is disabled")]
    Disabled,
    /// The integration is missing required settings.
    #[error("integration is not configured: {0}")]
    Unconfigured(String),
    /// Every step of the validate/refresh/reauthenticate cascade failed.
    #[error("authentication failed for {service}")]
    AuthFailed {
        /// Service name from the descriptor.
        service: String,
    },
}
