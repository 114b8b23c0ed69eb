//! Batch domain.
//!
//! - [`spec::BatchSpec`]: immutable batch request
//! - [`entities::Batch`]: aggregate root with the batch lifecycle
//! - [`value_objects::TaskSpec`] / [`value_objects::TaskResult`]: per-task
//!   input and outcome

pub mod entities;
pub mod spec;
pub mod value_objects;
