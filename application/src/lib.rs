//! Application layer for simbatch
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{RetryPolicy, SchedulerParams};
pub use ports::{
    batch_store::{BatchStore, StoreError},
    event_logger::{BatchEvent, BatchEventLogger, NoEventLogger},
    progress::{BatchProgressNotifier, NoProgress},
    text_generator::{Generation, GenerationError, GenerationRequest, TextGenerator},
};
pub use use_cases::query_batches::QueryBatchesUseCase;
pub use use_cases::run_batch::{BatchSubmission, RunBatchError, RunBatchUseCase};
pub use use_cases::run_continuation::ContinuationRunner;
pub use use_cases::schedule_tasks::TaskScheduler;
