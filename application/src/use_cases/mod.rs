//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod query_batches;
pub mod run_batch;
pub mod run_continuation;
pub mod schedule_tasks;
