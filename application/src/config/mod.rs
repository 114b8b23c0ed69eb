//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`SchedulerParams`]: concurrency budget, task cap, turn marker
//! - [`RetryPolicy`]: retries, backoff and timeouts for generator calls

pub mod retry_policy;
pub mod scheduler_params;

pub use retry_policy::RetryPolicy;
pub use scheduler_params::{DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_TASKS, SchedulerParams};
