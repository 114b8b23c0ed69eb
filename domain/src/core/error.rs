//! Domain error types

use crate::batch::entities::BatchStatus;
use crate::core::entity::EntityId;
use thiserror::Error;

/// A problem with a submitted [`BatchSpec`](crate::BatchSpec).
///
/// Validation happens before any task is scheduled; a batch whose spec has
/// one of these problems is recorded directly as `failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("batch name must not be blank")]
    BlankName,

    #[error("entity pool is empty")]
    EmptyPool,

    #[error("entity '{0}' appears more than once in the pool")]
    DuplicateEntity(EntityId),

    #[error("{field} must be at least 1")]
    ZeroValue { field: &'static str },

    #[error("interaction size {size} is invalid for a pool of {pool} entities")]
    InvalidCombinationSize { size: usize, pool: usize },

    #[error("requested {requested} tasks exceeds the limit of {limit}")]
    TooManyTasks { requested: usize, limit: usize },
}

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid batch transition from {from} to {to}")]
    InvalidTransition { from: BatchStatus, to: BatchStatus },

    #[error("Batch {0} is already finished")]
    BatchFinished(String),

    #[error("Task #{0} already has a result")]
    DuplicateResult(u32),

    #[error("Task #{sequence} is outside the batch (1..={total})")]
    UnknownTask { sequence: u32, total: usize },

    #[error("Batch still has {0} unresolved tasks")]
    Unresolved(usize),
}

impl DomainError {
    /// Check if this error is a spec validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation(_))
    }
}
