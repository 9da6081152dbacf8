//! Bridges pending updates to station PATCH calls.

use reqwest::Method;

use chansync_api::executor::RequestExecutor;
use chansync_api::outcome::RequestOutcome;
use chansync_api::strategy::LocalAuthStrategy;
use chansync_queue::{LocalUpdateApplier, PendingUpdate};

/// Applies one queued record as `PATCH stations/{id}` with a one-field body.
#[derive(Debug)]
pub struct StationUpdateApplier<S> {
    /// Executor for the target service.
    executor: RequestExecutor<S>,
}

impl<S> StationUpdateApplier<S> {
    /// Creates an applier over `executor`.
    #[must_use]
    pub const fn new(executor: RequestExecutor<S>) -> Self {
        Self { executor }
    }
}

impl<S: LocalAuthStrategy> LocalUpdateApplier for StationUpdateApplier<S> {
    async fn apply(&self, record: &PendingUpdate) -> RequestOutcome {
        let path = format!("stations/{}", record.station_id);
        let mut body = serde_json::Map::new();
        body.insert(
            record.field.clone(),
            serde_json::Value::String(record.new_value.clone()),
        );
        let body = serde_json::Value::Object(body);
        self.executor.execute(Method::PATCH, &path, Some(&body)).await
    }
}
