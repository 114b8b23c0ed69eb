//! Batch persistence port
//!
//! Defines where batch records and task results are kept. Every write is
//! idempotent so that callers may retry it.

use async_trait::async_trait;
use simbatch_domain::{Batch, BatchId, BatchRecord, BatchStatus, DomainError, TaskRecord};
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Batch not found: {0}")]
    NotFound(BatchId),

    #[error("Batch already exists: {0}")]
    AlreadyExists(BatchId),

    #[error("Invalid batch id: {0}")]
    InvalidId(BatchId),

    #[error("Rejected write: {0}")]
    Rejected(#[from] DomainError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence sink and query side for batches
///
/// Implementations live in the infrastructure layer.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Store a new batch header. Creating the same record twice is a no-op;
    /// creating a different record under an existing ID is an error.
    async fn create_batch(&self, record: &BatchRecord) -> Result<(), StoreError>;

    /// Move a batch to `status`, subject to the lifecycle rules.
    async fn set_batch_status(&self, id: &BatchId, status: BatchStatus)
    -> Result<(), StoreError>;

    /// Attach an error message to a batch header without changing its
    /// status. Attaching the same message twice is a no-op.
    async fn note_batch_error(&self, id: &BatchId, error: &str) -> Result<(), StoreError>;

    /// Store one task result, keyed by its sequence number.
    async fn save_task_result(&self, id: &BatchId, result: &TaskRecord) -> Result<(), StoreError>;

    /// Load a batch with all results stored so far.
    async fn get_batch(&self, id: &BatchId) -> Result<Option<Batch>, StoreError>;

    /// Task results of a batch, sorted by sequence number.
    async fn list_task_results(&self, id: &BatchId) -> Result<Vec<TaskRecord>, StoreError>;

    /// All batch headers, newest first.
    async fn list_batches(&self) -> Result<Vec<BatchRecord>, StoreError>;
}
