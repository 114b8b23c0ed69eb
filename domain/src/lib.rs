//! Domain layer for simbatch
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Batch
//!
//! A batch asks for many independent simulations over combinations of
//! entities. It moves through `pending → in_progress → completed | partial |
//! failed`; the terminal status is computed from the task outcomes.
//!
//! ## Task and Round
//!
//! - **Task**: one simulation over one sampled combination
//! - **Round**: one generator call within a task; rounds run in sequence and
//!   carry the accumulated content and turn number forward

pub mod batch;
pub mod config;
pub mod continuation;
pub mod core;
pub mod sampling;

// Re-export commonly used types
pub use batch::{
    entities::{Batch, BatchId, BatchRecord, BatchStatus, BatchSummary},
    spec::BatchSpec,
    value_objects::{RoundMetadata, TaskRecord, TaskResult, TaskSpec},
};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use continuation::{
    parsing::{DEFAULT_TURN_MARKER, last_turn_marker, parse_reported_turn},
    turn_state::{ROUND_SEPARATOR, TurnSource, TurnState, resolve_final_turn},
};
pub use crate::core::{
    entity::EntityId,
    error::{DomainError, ValidationError},
};
pub use sampling::combination::{combination_count, plan_tasks, sample_combinations};
