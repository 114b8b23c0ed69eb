//! Batch value objects - immutable task types.
//!
//! - [`TaskSpec`] - one sampled combination, ready to run
//! - [`TaskResult`] - outcome of running one task (success or failure)
//! - [`RoundMetadata`] - what happened in one round of a successful task
//! - [`TaskRecord`] - a result tagged with its sequence number, as persisted

use crate::batch::entities::BatchId;
use crate::continuation::turn_state::TurnSource;
use crate::core::entity::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One simulation task over one sampled entity combination.
///
/// The sequence number is assigned at sampling time and is the only ordering
/// key for persistence and display. Tasks complete in arbitrary order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub batch_id: BatchId,
    /// 1-indexed position within the batch
    pub sequence: u32,
    pub entities: Vec<EntityId>,
    pub context: String,
    pub turns_per_round: u32,
    pub rounds: u32,
}

impl TaskSpec {
    /// Short label used in log lines, e.g. `batch 1f2e…#3`.
    pub fn label(&self) -> String {
        format!("{}#{}", self.batch_id.short(), self.sequence)
    }
}

/// Metadata for one completed round of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundMetadata {
    /// 1-indexed round number
    pub round: u32,
    pub turns_requested: u32,
    /// Turn number the round started from
    pub start_turn: u32,
    /// Raw final-turn value as reported by the generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_turn: Option<String>,
    /// Turn number recorded after the round
    pub final_turn: u32,
    /// Where `final_turn` came from
    pub turn_source: TurnSource,
    pub content_chars: usize,
    pub elapsed_ms: u64,
}

/// Outcome of running one task.
///
/// A task is atomic: a failure in any round discards the content of the
/// rounds before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskResult {
    Success {
        content: String,
        final_turn_number: u32,
        rounds: Vec<RoundMetadata>,
    },
    Failure {
        error: String,
        /// Round that failed, when the failure came from a generator call
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failed_round: Option<u32>,
    },
}

impl TaskResult {
    pub fn success(content: impl Into<String>, final_turn_number: u32, rounds: Vec<RoundMetadata>) -> Self {
        Self::Success {
            content: content.into(),
            final_turn_number,
            rounds,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            failed_round: None,
        }
    }

    pub fn round_failure(error: impl Into<String>, round: u32) -> Self {
        Self::Failure {
            error: error.into(),
            failed_round: Some(round),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Success { content, .. } => Some(content),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

/// A task result tagged with the task it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub sequence: u32,
    pub entities: Vec<EntityId>,
    pub result: TaskResult,
    pub completed_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(sequence: u32, entities: Vec<EntityId>, result: TaskResult) -> Self {
        Self {
            sequence,
            entities,
            result,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_result_accessors() {
        let ok = TaskResult::success("Turn 1: hello", 1, vec![]);
        assert!(ok.is_success());
        assert_eq!(ok.content(), Some("Turn 1: hello"));
        assert_eq!(ok.error(), None);

        let err = TaskResult::round_failure("timeout", 2);
        assert!(!err.is_success());
        assert_eq!(err.error(), Some("timeout"));
        assert_eq!(err.content(), None);
    }

    #[test]
    fn test_task_result_serializes_with_outcome_tag() {
        let json = serde_json::to_value(TaskResult::failure("boom")).unwrap();
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["error"], "boom");
        assert!(json.get("failed_round").is_none());
    }
}
