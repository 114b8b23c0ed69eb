//! Run Batch use case
//!
//! Owns the batch lifecycle:
//!
//! ```text
//! submit ── invalid ──▶ failed (never started)
//!    │
//!    └── valid ──▶ pending ──▶ in_progress ──▶ completed | partial | failed
//!                               (tasks run on the shared scheduler,
//!                                each result persisted as it arrives)
//! ```
//!
//! `submit` returns as soon as the batch record exists; the tasks run in
//! the background and callers observe progress through the store.

use crate::ports::batch_store::{BatchStore, StoreError};
use crate::ports::event_logger::{BatchEvent, BatchEventLogger, NoEventLogger};
use crate::ports::progress::{BatchProgressNotifier, NoProgress};
use crate::ports::text_generator::TextGenerator;
use crate::use_cases::query_batches::QueryBatchesUseCase;
use crate::use_cases::schedule_tasks::TaskScheduler;
use crate::config::DEFAULT_MAX_TASKS;
use rand::SeedableRng;
use rand::rngs::StdRng;
use simbatch_domain::{
    Batch, BatchId, BatchRecord, BatchSpec, BatchStatus, DomainError, TaskRecord, TaskResult,
    TaskSpec, plan_tasks,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Attempts per store write before a write is given up on
const STORE_ATTEMPTS: u32 = 3;
const STORE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Errors that can occur while running or querying batches
#[derive(Error, Debug)]
pub enum RunBatchError {
    #[error("Batch not found: {0}")]
    NotFound(BatchId),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Batch execution aborted: {0}")]
    Aborted(String),
}

/// Handle returned by [`RunBatchUseCase::submit`]
#[derive(Debug)]
pub struct BatchSubmission {
    pub batch_id: BatchId,
    /// Status at submission time: `pending`, or `failed` for a rejected spec
    pub status: BatchStatus,
    completion: Option<JoinHandle<Result<BatchStatus, RunBatchError>>>,
}

impl BatchSubmission {
    /// Whether the spec was rejected before any task was scheduled.
    pub fn is_rejected(&self) -> bool {
        self.completion.is_none()
    }

    /// Wait for the batch to reach its terminal status.
    pub async fn wait(self) -> Result<BatchStatus, RunBatchError> {
        match self.completion {
            None => Ok(self.status),
            Some(handle) => handle
                .await
                .map_err(|e| RunBatchError::Aborted(e.to_string()))?,
        }
    }

    /// Let the batch run without waiting for it.
    ///
    /// The work continues only while the runtime stays alive.
    pub fn detach(self) -> BatchId {
        self.batch_id
    }
}

/// Use case for creating, running and querying batches
pub struct RunBatchUseCase<G: TextGenerator + 'static, S: BatchStore + 'static> {
    scheduler: Arc<TaskScheduler<G>>,
    store: Arc<S>,
    max_tasks: usize,
    progress: Arc<dyn BatchProgressNotifier>,
    logger: Arc<dyn BatchEventLogger>,
}

impl<G: TextGenerator + 'static, S: BatchStore + 'static> RunBatchUseCase<G, S> {
    pub fn new(scheduler: Arc<TaskScheduler<G>>, store: Arc<S>) -> Self {
        Self {
            scheduler,
            store,
            max_tasks: DEFAULT_MAX_TASKS,
            progress: Arc::new(NoProgress),
            logger: Arc::new(NoEventLogger),
        }
    }

    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn BatchProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn BatchEventLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Create a batch and start running it in the background.
    ///
    /// An invalid spec still produces a stored batch, directly in `failed`
    /// with the validation message; it is not an error for the caller.
    /// Only a failure to store the batch record is.
    pub async fn submit(&self, spec: BatchSpec) -> Result<BatchSubmission, RunBatchError> {
        let batch_id = BatchId::generate();

        let problems = spec.validate(self.max_tasks);
        if !problems.is_empty() {
            let message = problems
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return self.reject(batch_id, spec, message).await;
        }

        let mut rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let tasks = match plan_tasks(&batch_id, &spec, &mut rng) {
            Ok(tasks) => tasks,
            Err(e) => return self.reject(batch_id, spec, e.to_string()).await,
        };

        if tasks.len() < spec.task_count {
            info!(
                "Batch {}: only {} distinct combinations exist, {} requested",
                batch_id,
                tasks.len(),
                spec.task_count
            );
        }

        let batch = Batch::new(batch_id.clone(), spec, tasks.len());
        self.store.create_batch(batch.record()).await?;
        info!(
            "Created batch {} ({}) with {} tasks",
            batch_id,
            batch.spec().name,
            tasks.len()
        );
        self.logger.log(BatchEvent::new(
            "batch_created",
            serde_json::json!({
                "batch_id": batch_id,
                "name": batch.spec().name,
                "planned_tasks": tasks.len(),
                "combinations": tasks.iter().map(|t| &t.entities).collect::<Vec<_>>(),
            }),
        ));

        let handle = tokio::spawn(Self::drive(
            batch,
            tasks,
            Arc::clone(&self.scheduler),
            Arc::clone(&self.store),
            Arc::clone(&self.progress),
            Arc::clone(&self.logger),
        ));

        Ok(BatchSubmission {
            batch_id,
            status: BatchStatus::Pending,
            completion: Some(handle),
        })
    }

    /// Read-only view over the same store.
    pub fn queries(&self) -> QueryBatchesUseCase<S> {
        QueryBatchesUseCase::new(Arc::clone(&self.store))
    }

    /// Current state of a batch, with the results stored so far.
    pub async fn get_batch(&self, id: &BatchId) -> Result<Batch, RunBatchError> {
        self.queries().get_batch(id).await
    }

    /// Stored results of a batch, sorted by sequence number.
    pub async fn list_task_results(&self, id: &BatchId) -> Result<Vec<TaskRecord>, RunBatchError> {
        self.queries().list_task_results(id).await
    }

    /// All known batches, newest first.
    pub async fn list_batches(&self) -> Result<Vec<BatchRecord>, RunBatchError> {
        self.queries().list_batches().await
    }

    async fn reject(
        &self,
        batch_id: BatchId,
        spec: BatchSpec,
        message: String,
    ) -> Result<BatchSubmission, RunBatchError> {
        warn!("Rejected batch {} ({}): {}", batch_id, spec.name, message);
        let batch = Batch::rejected(batch_id.clone(), spec, message.clone());
        self.store.create_batch(batch.record()).await?;
        self.logger.log(BatchEvent::new(
            "batch_rejected",
            serde_json::json!({
                "batch_id": batch_id,
                "name": batch.spec().name,
                "error": message,
            }),
        ));
        self.progress
            .on_batch_complete(&batch_id, BatchStatus::Failed);

        Ok(BatchSubmission {
            batch_id,
            status: BatchStatus::Failed,
            completion: None,
        })
    }

    /// Background half of a batch: run every task, persist each result as
    /// it arrives, then store the terminal status.
    ///
    /// Store failures never leave the stored batch silently unfinished: a
    /// batch that cannot be started is marked failed before any task runs,
    /// and results or statuses that could not be written are noted on the
    /// stored record.
    async fn drive(
        mut batch: Batch,
        tasks: Vec<TaskSpec>,
        scheduler: Arc<TaskScheduler<G>>,
        store: Arc<S>,
        progress: Arc<dyn BatchProgressNotifier>,
        logger: Arc<dyn BatchEventLogger>,
    ) -> Result<BatchStatus, RunBatchError> {
        let batch_id = batch.id().clone();
        let total = tasks.len();

        batch.start()?;
        if let Err(e) = Self::persist_status(&*store, &batch_id, BatchStatus::InProgress).await {
            let message = format!("batch could not be started: {}", e);
            error!("Batch {}: {}", batch_id, message);
            Self::abandon(&*store, &batch_id, &message).await;
            progress.on_batch_complete(&batch_id, BatchStatus::Failed);
            logger.log(BatchEvent::new(
                "batch_finished",
                serde_json::json!({
                    "batch_id": batch_id,
                    "status": BatchStatus::Failed,
                    "succeeded": 0,
                    "failed": 0,
                    "error": message,
                }),
            ));
            return Err(e.into());
        }
        info!("Batch {} started ({} tasks)", batch_id, total);
        progress.on_batch_start(&batch_id, total);
        logger.log(BatchEvent::new(
            "batch_started",
            serde_json::json!({ "batch_id": batch_id, "tasks": total }),
        ));

        let mut unsaved = Vec::new();
        let mut results = scheduler.schedule(tasks);
        while let Some(record) = results.recv().await {
            if let Err(e) = batch.record_result(record.clone()) {
                warn!("Batch {}: dropping result #{}: {}", batch_id, record.sequence, e);
                continue;
            }
            if !Self::persist_result(&*store, &batch_id, &record).await {
                unsaved.push(record.sequence);
            }

            match &record.result {
                TaskResult::Success {
                    final_turn_number, ..
                } => info!(
                    "Batch {}: task #{} succeeded at turn {}",
                    batch_id, record.sequence, final_turn_number
                ),
                TaskResult::Failure { error, .. } => warn!(
                    "Batch {}: task #{} failed: {}",
                    batch_id, record.sequence, error
                ),
            }
            progress.on_task_complete(&batch_id, &record);
            logger.log(BatchEvent::new(
                "task_completed",
                serde_json::json!({ "batch_id": batch_id, "task": record }),
            ));
        }

        for sequence in batch.unresolved_sequences() {
            error!("Batch {}: task #{} never reported", batch_id, sequence);
            let record = TaskRecord::new(
                sequence,
                Vec::new(),
                TaskResult::failure("no result was reported for this task"),
            );
            batch.record_result(record.clone())?;
            if !Self::persist_result(&*store, &batch_id, &record).await {
                unsaved.push(sequence);
            }
            progress.on_task_complete(&batch_id, &record);
        }

        let status = batch.finish()?;

        if !unsaved.is_empty() {
            unsaved.sort_unstable();
            let message = format!(
                "results of tasks {} could not be stored",
                unsaved
                    .iter()
                    .map(|seq| format!("#{}", seq))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            batch.note_error(&message);
            Self::persist_note(&*store, &batch_id, &message).await;
        }

        if let Err(e) = Self::persist_terminal_status(&*store, &batch_id, status).await {
            let message = format!("final status {} could not be stored: {}", status, e);
            error!("Batch {}: {}", batch_id, message);
            Self::persist_note(&*store, &batch_id, &message).await;
            progress.on_batch_complete(&batch_id, status);
            return Err(e.into());
        }

        let summary = batch.summary();
        info!(
            "Batch {} finished: {} ({}/{} succeeded)",
            batch_id, status, summary.succeeded, summary.total
        );
        progress.on_batch_complete(&batch_id, status);
        logger.log(BatchEvent::new(
            "batch_finished",
            serde_json::json!({
                "batch_id": batch_id,
                "status": status,
                "succeeded": summary.succeeded,
                "failed": summary.failed,
                "error": batch.error(),
            }),
        ));

        Ok(status)
    }

    async fn persist_status(
        store: &S,
        batch_id: &BatchId,
        status: BatchStatus,
    ) -> Result<(), StoreError> {
        with_store_retry("store batch status", move || {
            store.set_batch_status(batch_id, status)
        })
        .await
    }

    /// Terminal writes get a second round of retries after a pause.
    async fn persist_terminal_status(
        store: &S,
        batch_id: &BatchId,
        status: BatchStatus,
    ) -> Result<(), StoreError> {
        match Self::persist_status(store, batch_id, status).await {
            Err(StoreError::Io(e)) => {
                warn!(
                    "Batch {}: storing status {} failed, trying once more: {}",
                    batch_id, status, e
                );
                tokio::time::sleep(STORE_RETRY_DELAY * STORE_ATTEMPTS).await;
                Self::persist_status(store, batch_id, status).await
            }
            other => other,
        }
    }

    /// A result that cannot be stored is logged and the batch goes on; the
    /// in-memory aggregate still counts it toward the terminal status.
    /// Returns whether the result was stored.
    async fn persist_result(store: &S, batch_id: &BatchId, record: &TaskRecord) -> bool {
        match with_store_retry("store task result", move || {
            store.save_task_result(batch_id, record)
        })
        .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Batch {}: failed to store result #{}: {}",
                    batch_id, record.sequence, e
                );
                false
            }
        }
    }

    async fn persist_note(store: &S, batch_id: &BatchId, message: &str) {
        if let Err(e) = with_store_retry("store batch error", move || {
            store.note_batch_error(batch_id, message)
        })
        .await
        {
            error!("Batch {}: could not store error note: {}", batch_id, e);
        }
    }

    /// Best effort: attach `message` and move the stored batch to `failed`.
    async fn abandon(store: &S, batch_id: &BatchId, message: &str) {
        Self::persist_note(store, batch_id, message).await;
        if let Err(e) = Self::persist_status(store, batch_id, BatchStatus::Failed).await {
            error!("Batch {}: could not mark batch as failed: {}", batch_id, e);
        }
    }
}

/// Retry a store write on I/O errors. Writes are idempotent, so repeating
/// one that partly succeeded is safe.
async fn with_store_retry<F, Fut>(what: &str, mut op: F) -> Result<(), StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(()) => return Ok(()),
            Err(StoreError::Io(e)) if attempt < STORE_ATTEMPTS => {
                warn!("Failed to {} (attempt {}): {}", what, attempt, e);
                tokio::time::sleep(STORE_RETRY_DELAY * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
