//! Batch request specification

use crate::core::entity::EntityId;
use crate::core::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Request to run a batch of simulations (Value Object)
///
/// Describes which entities may take part, how many of them interact in one
/// task (`interaction_size`, a.k.a. `k`), how many tasks to run
/// (`task_count`, `N`), and how each task is driven: `rounds_per_task`
/// sequential generator calls (`R`), each asking for `turns_per_round`
/// turns (`T`).
///
/// # Example
///
/// ```toml
/// name = "tavern-evening"
/// entities = ["innkeeper", "bard", "guard", "merchant", "thief"]
/// interaction_size = 2
/// task_count = 6
/// turns_per_round = 4
/// rounds_per_task = 3
/// context = "A rainy evening in the Drowned Rat tavern."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Pool of entities that combinations are drawn from
    pub entities: Vec<EntityId>,
    /// Entities per task (`k`)
    pub interaction_size: usize,
    /// Requested number of tasks (`N`)
    pub task_count: usize,
    /// Turns requested from the generator in each round (`T`)
    pub turns_per_round: u32,
    /// Sequential generator calls per task (`R`)
    #[serde(default = "default_rounds")]
    pub rounds_per_task: u32,
    /// Free-form context handed to every generator call
    #[serde(default)]
    pub context: String,
    /// Seed for combination sampling; random when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

fn default_rounds() -> u32 {
    1
}

impl BatchSpec {
    pub fn new(
        name: impl Into<String>,
        entities: impl IntoIterator<Item = impl Into<EntityId>>,
        interaction_size: usize,
        task_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            entities: entities.into_iter().map(Into::into).collect(),
            interaction_size,
            task_count,
            turns_per_round: 1,
            rounds_per_task: 1,
            context: String::new(),
            seed: None,
            metadata: BTreeMap::new(),
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_turns_per_round(mut self, turns: u32) -> Self {
        self.turns_per_round = turns;
        self
    }

    pub fn with_rounds_per_task(mut self, rounds: u32) -> Self {
        self.rounds_per_task = rounds;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Check the spec against its invariants.
    ///
    /// Returns every problem found, not just the first, so a rejected batch
    /// can report all of them at once. An empty vector means the spec is
    /// valid. `max_tasks` is the service-wide cap on `task_count`.
    pub fn validate(&self, max_tasks: usize) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::BlankName);
        }

        if self.entities.is_empty() {
            errors.push(ValidationError::EmptyPool);
        }

        let mut seen = HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity) {
                errors.push(ValidationError::DuplicateEntity(entity.clone()));
            }
        }

        if self.interaction_size == 0 {
            errors.push(ValidationError::ZeroValue {
                field: "interaction_size",
            });
        } else if !self.entities.is_empty() && self.interaction_size > self.entities.len() {
            errors.push(ValidationError::InvalidCombinationSize {
                size: self.interaction_size,
                pool: self.entities.len(),
            });
        }

        if self.task_count == 0 {
            errors.push(ValidationError::ZeroValue {
                field: "task_count",
            });
        } else if self.task_count > max_tasks {
            errors.push(ValidationError::TooManyTasks {
                requested: self.task_count,
                limit: max_tasks,
            });
        }

        if self.turns_per_round == 0 {
            errors.push(ValidationError::ZeroValue {
                field: "turns_per_round",
            });
        }

        if self.rounds_per_task == 0 {
            errors.push(ValidationError::ZeroValue {
                field: "rounds_per_task",
            });
        }

        errors
    }
}
