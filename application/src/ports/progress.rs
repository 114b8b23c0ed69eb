//! Progress notification port
//!
//! Defines the interface for reporting progress while batches run.

use simbatch_domain::{BatchId, BatchStatus, TaskRecord};

/// Callback for progress updates during batch execution
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (progress bars, plain lines, etc.).
/// Callbacks for different batches may interleave.
pub trait BatchProgressNotifier: Send + Sync {
    /// Called when a batch moves to `in_progress`
    fn on_batch_start(&self, batch_id: &BatchId, total_tasks: usize);

    /// Called when a task result has been recorded
    fn on_task_complete(&self, batch_id: &BatchId, record: &TaskRecord);

    /// Called when a batch reaches its terminal status
    fn on_batch_complete(&self, batch_id: &BatchId, status: BatchStatus);

    /// Called after each successful round of a task.
    fn on_round_complete(&self, _batch_id: &BatchId, _sequence: u32, _round: u32, _rounds: u32) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl BatchProgressNotifier for NoProgress {
    fn on_batch_start(&self, _batch_id: &BatchId, _total_tasks: usize) {}
    fn on_task_complete(&self, _batch_id: &BatchId, _record: &TaskRecord) {}
    fn on_batch_complete(&self, _batch_id: &BatchId, _status: BatchStatus) {}
}
