//! Logging infrastructure: structured batch event logging.
//!
//! Provides [`JsonlEventLogger`], a JSONL file writer that implements
//! the [`BatchEventLogger`](simbatch_application::BatchEventLogger) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlEventLogger;
