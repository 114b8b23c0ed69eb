//! Scheduler parameters: batch execution limits.
//!
//! [`SchedulerParams`] groups the static limits that bound batch execution
//! in [`RunBatchUseCase`](crate::use_cases::run_batch::RunBatchUseCase).

use serde::{Deserialize, Serialize};

/// Concurrency used when none is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Task cap used when none is configured.
pub const DEFAULT_MAX_TASKS: usize = 1000;

/// Batch execution limits.
///
/// `max_concurrency` is a process-wide budget: all batches running in the
/// process share it, it is not multiplied per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerParams {
    /// Maximum tasks talking to the generator at the same time.
    pub max_concurrency: usize,
    /// Maximum tasks a single batch may request.
    pub max_tasks: usize,
    /// Marker word for the turn number fallback scan.
    pub turn_marker: String,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_tasks: DEFAULT_MAX_TASKS,
            turn_marker: simbatch_domain::DEFAULT_TURN_MARKER.to_string(),
        }
    }
}

impl SchedulerParams {
    // ==================== Builder Methods ====================

    /// Set the concurrency budget (values below 1 are raised to 1).
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn with_max_tasks(mut self, max: usize) -> Self {
        self.max_tasks = max;
        self
    }

    pub fn with_turn_marker(mut self, marker: impl Into<String>) -> Self {
        self.turn_marker = marker.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = SchedulerParams::default();
        assert_eq!(params.max_concurrency, 8);
        assert_eq!(params.max_tasks, 1000);
        assert_eq!(params.turn_marker, "turn");
    }

    #[test]
    fn test_builder() {
        let params = SchedulerParams::default()
            .with_max_concurrency(0)
            .with_max_tasks(50)
            .with_turn_marker("step");

        assert_eq!(params.max_concurrency, 1);
        assert_eq!(params.max_tasks, 50);
        assert_eq!(params.turn_marker, "step");
    }
}
