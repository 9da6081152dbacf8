//! Pending update queue and batch executor for chansync.
//!
//! Holds the flat queue file of station-metadata changes produced by the
//! matching workflow and drains it against a remote service with preview,
//! confirmation, per-record progress, and a success/failure summary.

/// Batch drain state machine.
pub mod batch;
/// Queue file records.
pub mod record;

pub use batch::{
    BatchOutcome, BatchSummary, BatchUpdateExecutor, Confirmer, LocalUpdateApplier, Sink,
    UpdateApplier,
};
pub use record::{PendingUpdate, QueueFile};
