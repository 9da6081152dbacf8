//! Batch drain state machine.
//!
//! Loaded → Previewed → Confirmed → Draining → Cleared. Per-record failures
//! never stop the drain: each record is an independent remote mutation with
//! no cross-record dependency, so maximizing the applied count beats
//! all-or-nothing rollback. The queue is cleared unconditionally after one
//! completed run and a summary is always emitted, even when every record
//! failed.

#![allow(clippy::future_not_send)]

use anyhow::Result;

use chansync_api::outcome::RequestOutcome;

use crate::record::{PendingUpdate, QueueFile};

/// How many records the preview renders before collapsing the remainder.
const PREVIEW_LIMIT: usize = 10;

/// Destination for human-readable progress and summary lines.
pub trait Sink {
    /// Emits one line.
    fn line(&mut self, text: &str);
}

/// Asks the user to confirm the drain.
pub trait Confirmer {
    /// Returns `true` to proceed. Declining must leave no side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Applies one pending update against the remote service.
///
/// Abstracted as a trait so drain tests run against a scripted stub.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[trait_variant::make(UpdateApplier: Send)]
pub trait LocalUpdateApplier {
    /// Issues the remote mutation for `record`.
    async fn apply(&self, record: &PendingUpdate) -> RequestOutcome;
}

/// Result of one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing was queued; no side effects.
    Empty,
    /// The user declined; queue untouched, zero requests issued.
    Declined,
    /// The drain ran to completion and the queue was cleared.
    Completed(BatchSummary),
}

/// Applied/failed/total counts of a completed drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records the remote service accepted.
    pub applied: usize,
    /// Records that failed (reported by label, not retained).
    pub failed: usize,
    /// Records drained.
    pub total: usize,
}

/// Drains the pending update queue through an applier.
#[derive(Debug)]
pub struct BatchUpdateExecutor {
    /// The queue being consumed.
    queue: QueueFile,
}

impl BatchUpdateExecutor {
    /// Creates an executor over `queue`.
    #[must_use]
    pub const fn new(queue: QueueFile) -> Self {
        Self { queue }
    }

    /// Runs the whole flow: load, preview, confirm, drain, clear, summarize.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue file cannot be read, the confirmation
    /// cannot be read, or the queue cannot be cleared after the drain.
    /// Per-record request failures are counted, not raised.
    #[allow(clippy::arithmetic_side_effects)]
    pub async fn run<A, S, C>(
        &self,
        applier: &A,
        sink: &mut S,
        confirmer: &mut C,
    ) -> Result<BatchOutcome>
    where
        A: LocalUpdateApplier,
        S: Sink,
        C: Confirmer,
    {
        let records = self.queue.load()?;
        if records.is_empty() {
            sink.line("no pending updates queued");
            return Ok(BatchOutcome::Empty);
        }

        self.preview(&records, sink);

        let prompt = format!("apply {} pending update(s)?", records.len());
        if !confirmer.confirm(&prompt)? {
            sink.line("aborted, queue left untouched");
            return Ok(BatchOutcome::Declined);
        }

        let total = records.len();
        let mut failed = 0usize;
        for (idx, record) in records.iter().enumerate() {
            let current = idx + 1;
            let percent = current * 100 / total;
            sink.line(&format!(
                "[{percent}%] ({current}/{total}) updating: {} → {}",
                record.label, record.new_value
            ));
            match applier.apply(record).await {
                RequestOutcome::Success(_) => {
                    tracing::debug!(station_id = %record.station_id, "update applied");
                }
                RequestOutcome::Failure(kind) => {
                    failed += 1;
                    sink.line(&format!("  failed: {} ({kind})", record.label));
                }
            }
        }

        // Failed records are dropped with the rest: a permanently-broken
        // record must not make the queue grow stale forever.
        self.queue.clear()?;

        let summary = BatchSummary {
            applied: total - failed,
            failed,
            total,
        };
        sink.line(&format!(
            "applied: {}, failed: {}, total: {}",
            summary.applied, summary.failed, summary.total
        ));
        Ok(BatchOutcome::Completed(summary))
    }

    /// Renders the first records plus a count of the remainder.
    #[allow(clippy::arithmetic_side_effects)]
    fn preview<S: Sink>(&self, records: &[PendingUpdate], sink: &mut S) {
        sink.line(&format!("{} pending update(s):", records.len()));
        for record in records.iter().take(PREVIEW_LIMIT) {
            sink.line(&format!(
                "  {}: {} → {}",
                record.label, record.field, record.new_value
            ));
        }
        if records.len() > PREVIEW_LIMIT {
            sink.line(&format!("  ... and {} more", records.len() - PREVIEW_LIMIT));
        }
    }
}
