//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod batch_store;
pub mod event_logger;
pub mod progress;
pub mod text_generator;
