//! Batch domain entities
//!
//! A [`Batch`] is the aggregate root for one batch request. Its persisted
//! header is a [`BatchRecord`]; the task results are stored next to it and
//! reassembled with [`Batch::from_parts`].
//!
//! ```text
//! pending ──start──▶ in_progress ──finish──▶ completed | partial | failed
//!    │
//!    └─ (validation failure: created directly as failed)
//! ```

use crate::batch::spec::BatchSpec;
use crate::batch::value_objects::TaskRecord;
use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new random (v4 UUID) batch ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines and progress bars.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl From<&str> for BatchId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    /// Every task succeeded
    Completed,
    /// Some tasks succeeded, some failed
    Partial,
    /// No task succeeded, or the spec was rejected
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Completed => "completed",
            BatchStatus::Partial => "partial",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Partial | BatchStatus::Failed
        )
    }

    /// Terminal status for a fully resolved batch.
    ///
    /// `failed` when nothing succeeded, `completed` when everything did,
    /// `partial` otherwise.
    pub fn from_outcomes(successes: usize, total: usize) -> Self {
        if successes == 0 {
            BatchStatus::Failed
        } else if successes >= total {
            BatchStatus::Completed
        } else {
            BatchStatus::Partial
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Re-applying the current status is allowed so that status writes can
    /// be retried.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            BatchStatus::Pending => matches!(next, BatchStatus::InProgress | BatchStatus::Failed),
            BatchStatus::InProgress => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "in_progress" => Ok(BatchStatus::InProgress),
            "completed" => Ok(BatchStatus::Completed),
            "partial" => Ok(BatchStatus::Partial),
            "failed" => Ok(BatchStatus::Failed),
            other => Err(format!("unknown batch status '{}'", other)),
        }
    }
}

/// Persisted header of a batch (everything except the task results).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub id: BatchId,
    pub spec: BatchSpec,
    pub status: BatchStatus,
    /// Number of sampled tasks; may be lower than `spec.task_count` when the
    /// combination space is smaller than the request.
    pub planned_tasks: usize,
    /// Validation error for rejected batches, or what went wrong while
    /// storing a running one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchRecord {
    /// Apply a status write, stamping start/finish times.
    ///
    /// Idempotent: writing the current status again changes nothing.
    pub fn apply_status(&mut self, status: BatchStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(status) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        if self.status == status {
            return Ok(());
        }

        let now = Utc::now();
        if status == BatchStatus::InProgress && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if status.is_terminal() && self.finished_at.is_none() {
            self.finished_at = Some(now);
        }
        self.status = status;
        Ok(())
    }

    /// Attach an error message. Messages accumulate, separated by `"; "`;
    /// attaching one that is already present changes nothing.
    pub fn note_error(&mut self, error: &str) {
        match &mut self.error {
            Some(existing) if existing.split("; ").any(|e| e == error) => {}
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(error);
            }
            None => self.error = Some(error.to_string()),
        }
    }
}

/// Task counts for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pending: usize,
}

/// A batch of simulation tasks (Aggregate Root)
///
/// Owns the task results. Results are appended in completion order and
/// never removed; readers use [`Batch::results_by_sequence`] for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    record: BatchRecord,
    results: Vec<TaskRecord>,
}

impl Batch {
    /// Create a pending batch for a validated spec and its planned task count.
    pub fn new(id: BatchId, spec: BatchSpec, planned_tasks: usize) -> Self {
        Self {
            record: BatchRecord {
                id,
                spec,
                status: BatchStatus::Pending,
                planned_tasks,
                error: None,
                created_at: Utc::now(),
                started_at: None,
                finished_at: None,
            },
            results: Vec::new(),
        }
    }

    /// Create a batch that was rejected before scheduling.
    ///
    /// The batch starts (and stays) `failed`; it never enters `in_progress`.
    pub fn rejected(id: BatchId, spec: BatchSpec, error: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            record: BatchRecord {
                id,
                spec,
                status: BatchStatus::Failed,
                planned_tasks: 0,
                error: Some(error.into()),
                created_at: now,
                started_at: None,
                finished_at: Some(now),
            },
            results: Vec::new(),
        }
    }

    /// Reassemble a batch from its stored header and results.
    pub fn from_parts(record: BatchRecord, mut results: Vec<TaskRecord>) -> Self {
        results.sort_by_key(|r| r.sequence);
        Self { record, results }
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> &BatchId {
        &self.record.id
    }

    pub fn spec(&self) -> &BatchSpec {
        &self.record.spec
    }

    pub fn status(&self) -> BatchStatus {
        self.record.status
    }

    pub fn error(&self) -> Option<&str> {
        self.record.error.as_deref()
    }

    pub fn planned_tasks(&self) -> usize {
        self.record.planned_tasks
    }

    pub fn record(&self) -> &BatchRecord {
        &self.record
    }

    pub fn results(&self) -> &[TaskRecord] {
        &self.results
    }

    /// Results sorted by task sequence number.
    pub fn results_by_sequence(&self) -> Vec<&TaskRecord> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by_key(|r| r.sequence);
        sorted
    }

    pub fn is_terminal(&self) -> bool {
        self.record.status.is_terminal()
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.results.len() >= self.record.planned_tasks
    }

    /// Sequence numbers that do not have a result yet.
    pub fn unresolved_sequences(&self) -> Vec<u32> {
        let done: BTreeSet<u32> = self.results.iter().map(|r| r.sequence).collect();
        (1..=self.record.planned_tasks as u32)
            .filter(|seq| !done.contains(seq))
            .collect()
    }

    pub fn summary(&self) -> BatchSummary {
        let succeeded = self.results.iter().filter(|r| r.is_success()).count();
        let failed = self.results.len() - succeeded;
        BatchSummary {
            total: self.record.planned_tasks,
            succeeded,
            failed,
            pending: self.record.planned_tasks.saturating_sub(self.results.len()),
        }
    }

    // ==================== State Transitions ====================

    pub fn note_error(&mut self, error: &str) {
        self.record.note_error(error);
    }

    /// `pending → in_progress`
    pub fn start(&mut self) -> Result<(), DomainError> {
        if self.record.status != BatchStatus::Pending {
            return Err(DomainError::InvalidTransition {
                from: self.record.status,
                to: BatchStatus::InProgress,
            });
        }
        self.record.apply_status(BatchStatus::InProgress)
    }

    /// Append one task result.
    ///
    /// Only allowed while the batch is in progress; each sequence number may
    /// be recorded once.
    pub fn record_result(&mut self, record: TaskRecord) -> Result<(), DomainError> {
        if self.record.status.is_terminal() {
            return Err(DomainError::BatchFinished(self.record.id.to_string()));
        }
        if self.record.status != BatchStatus::InProgress {
            return Err(DomainError::InvalidTransition {
                from: self.record.status,
                to: BatchStatus::InProgress,
            });
        }
        if record.sequence == 0 || record.sequence as usize > self.record.planned_tasks {
            return Err(DomainError::UnknownTask {
                sequence: record.sequence,
                total: self.record.planned_tasks,
            });
        }
        if self.results.iter().any(|r| r.sequence == record.sequence) {
            return Err(DomainError::DuplicateResult(record.sequence));
        }
        self.results.push(record);
        Ok(())
    }

    /// `in_progress → completed | partial | failed`
    ///
    /// The terminal status is computed from the recorded outcomes; every
    /// planned task must have a result first.
    pub fn finish(&mut self) -> Result<BatchStatus, DomainError> {
        if self.record.status != BatchStatus::InProgress {
            return Err(DomainError::InvalidTransition {
                from: self.record.status,
                to: BatchStatus::Completed,
            });
        }
        if !self.is_fully_resolved() {
            return Err(DomainError::Unresolved(
                self.record.planned_tasks - self.results.len(),
            ));
        }

        let successes = self.results.iter().filter(|r| r.is_success()).count();
        let status = BatchStatus::from_outcomes(successes, self.record.planned_tasks);
        self.record.apply_status(status)?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::value_objects::TaskResult;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn spec() -> BatchSpec {
        BatchSpec::new("test", ["a", "b", "c"], 2, 3)
    }

    fn ok(seq: u32) -> TaskRecord {
        TaskRecord::new(seq, vec![], TaskResult::success("content", 3, vec![]))
    }

    fn err(seq: u32) -> TaskRecord {
        TaskRecord::new(seq, vec![], TaskResult::failure("boom"))
    }

    fn running(planned: usize) -> Batch {
        let mut batch = Batch::new(BatchId::generate(), spec(), planned);
        batch.start().unwrap();
        batch
    }

    #[test]
    fn test_new_batch_is_pending() {
        let batch = Batch::new(BatchId::from("b-1"), spec(), 3);
        assert_eq!(batch.status(), BatchStatus::Pending);
        assert_eq!(batch.summary().pending, 3);
        assert!(batch.record().started_at.is_none());
    }

    #[test]
    fn test_rejected_batch_is_failed_and_never_started() {
        let batch = Batch::rejected(BatchId::from("b-2"), spec(), "entity pool is empty");
        assert_eq!(batch.status(), BatchStatus::Failed);
        assert_eq!(batch.error(), Some("entity pool is empty"));
        assert!(batch.record().started_at.is_none());
        assert!(batch.record().finished_at.is_some());
    }

    #[test]
    fn test_lifecycle_all_success_is_completed() {
        let mut batch = running(2);
        batch.record_result(ok(2)).unwrap();
        batch.record_result(ok(1)).unwrap();
        assert_eq!(batch.finish().unwrap(), BatchStatus::Completed);
        assert!(batch.record().finished_at.is_some());
    }

    #[test]
    fn test_lifecycle_mixed_is_partial() {
        let mut batch = running(4);
        for seq in [1, 3, 4] {
            batch.record_result(ok(seq)).unwrap();
        }
        batch.record_result(err(2)).unwrap();
        assert_eq!(batch.finish().unwrap(), BatchStatus::Partial);
        let summary = batch.summary();
        assert_eq!((summary.succeeded, summary.failed), (3, 1));
    }

    #[test]
    fn test_lifecycle_all_failure_is_failed() {
        let mut batch = running(2);
        batch.record_result(err(1)).unwrap();
        batch.record_result(err(2)).unwrap();
        assert_eq!(batch.finish().unwrap(), BatchStatus::Failed);
    }

    #[test]
    fn test_cannot_finish_with_unresolved_tasks() {
        let mut batch = running(3);
        batch.record_result(ok(2)).unwrap();
        assert_eq!(batch.finish(), Err(DomainError::Unresolved(2)));
        assert_eq!(batch.unresolved_sequences(), vec![1, 3]);
    }

    #[test]
    fn test_duplicate_and_unknown_results_rejected() {
        let mut batch = running(2);
        batch.record_result(ok(1)).unwrap();
        assert_eq!(batch.record_result(ok(1)), Err(DomainError::DuplicateResult(1)));
        assert!(matches!(
            batch.record_result(ok(3)),
            Err(DomainError::UnknownTask { sequence: 3, .. })
        ));
        assert!(matches!(
            batch.record_result(ok(0)),
            Err(DomainError::UnknownTask { sequence: 0, .. })
        ));
    }

    #[test]
    fn test_terminal_batch_is_immutable() {
        let mut batch = running(1);
        batch.record_result(ok(1)).unwrap();
        batch.finish().unwrap();

        assert!(matches!(
            batch.record_result(ok(1)),
            Err(DomainError::BatchFinished(_))
        ));
        assert!(batch.start().is_err());
        assert!(batch.finish().is_err());
    }

    #[test]
    fn test_results_not_accepted_before_start() {
        let mut batch = Batch::new(BatchId::generate(), spec(), 1);
        assert!(batch.record_result(ok(1)).is_err());
    }

    #[test]
    fn test_results_by_sequence_sorted() {
        let mut batch = running(3);
        for seq in [3, 1, 2] {
            batch.record_result(ok(seq)).unwrap();
        }
        let order: Vec<u32> = batch.results_by_sequence().iter().map(|r| r.sequence).collect();
        assert_eq!(order, vec![1, 2, 3]);
        // Storage order is arrival order
        assert_eq!(batch.results()[0].sequence, 3);
    }

    #[test]
    fn test_status_transitions() {
        use BatchStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Partial));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Partial.can_transition_to(Failed));
        assert!(Completed.can_transition_to(Completed));
    }

    #[test]
    fn test_record_apply_status_is_idempotent() {
        let mut record = Batch::new(BatchId::generate(), spec(), 1).record().clone();
        record.apply_status(BatchStatus::InProgress).unwrap();
        let started = record.started_at;
        record.apply_status(BatchStatus::InProgress).unwrap();
        assert_eq!(record.started_at, started);
        record.apply_status(BatchStatus::Partial).unwrap();
        assert!(record.apply_status(BatchStatus::Completed).is_err());
    }

    #[test]
    fn test_note_error_accumulates_without_duplicates() {
        let mut record = Batch::new(BatchId::generate(), spec(), 1).record().clone();
        record.note_error("disk full");
        record.note_error("disk full");
        assert_eq!(record.error.as_deref(), Some("disk full"));

        record.note_error("result #2 not stored");
        assert_eq!(
            record.error.as_deref(),
            Some("disk full; result #2 not stored")
        );
    }

    #[test]
    fn test_status_computation_property() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let len = rng.gen_range(1..=20);
            let outcomes: Vec<bool> = (0..len).map(|_| rng.gen_bool(0.5)).collect();

            let mut batch = running(len);
            for (i, success) in outcomes.iter().enumerate() {
                let seq = i as u32 + 1;
                batch
                    .record_result(if *success { ok(seq) } else { err(seq) })
                    .unwrap();
            }
            let status = batch.finish().unwrap();

            let successes = outcomes.iter().filter(|s| **s).count();
            assert_eq!(status == BatchStatus::Failed, successes == 0);
            assert_eq!(status == BatchStatus::Completed, successes == len);
            assert_eq!(
                status == BatchStatus::Partial,
                successes > 0 && successes < len
            );
        }
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            BatchStatus::Pending,
            BatchStatus::InProgress,
            BatchStatus::Completed,
            BatchStatus::Partial,
            BatchStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<BatchStatus>(), Ok(status));
        }
    }
}
