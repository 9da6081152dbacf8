//! Elapsed-time gate deciding when a session needs re-validation.

use std::time::{Duration, Instant};

/// Default trust window for a confirmed session.
pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(30);

/// Cache TTL on "this session was confirmed good."
///
/// Not a token-expiry prediction: the threshold only bounds how long a
/// previously confirmed session is trusted without a re-check.
///
/// Callers must stamp the gate (`mark_checked_now`) immediately after
/// deciding a check is needed and before the check itself runs, so a burst
/// of calls arriving while a validation is in flight does not launch
/// redundant re-authentication attempts.
#[derive(Debug)]
pub struct FreshnessGate {
    /// When the session was last confirmed (or stamped pre-check).
    last_validated_at: Option<Instant>,
    /// Seconds a confirmed session is trusted.
    threshold: Duration,
}

impl FreshnessGate {
    /// Creates a gate that starts stale.
    #[must_use]
    pub const fn new(threshold: Duration) -> Self {
        Self {
            last_validated_at: None,
            threshold,
        }
    }

    /// Returns `true` if the session should be re-validated now.
    #[must_use]
    pub fn needs_check(&self) -> bool {
        self.last_validated_at
            .is_none_or(|at| at.elapsed() >= self.threshold)
    }

    /// Stamps the gate. Call before the check runs, not after it completes.
    pub fn mark_checked_now(&mut self) {
        self.last_validated_at = Some(Instant::now());
    }

    /// Forces the next `needs_check()` to return `true`.
    ///
    /// Used when the server contradicts a cached "fresh" flag (HTTP 401) and
    /// when a cascade run fails, so the next caller re-enters the cascade.
    pub fn force_stale(&mut self) {
        self.last_validated_at = None;
    }
}

impl Default for FreshnessGate {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
