//! Text generator adapters
//!
//! - [`HttpTextGenerator`] - remote generation service over HTTP/JSON
//! - [`DryRunGenerator`] - offline, deterministic output
//! - [`RetryingGenerator`] - timeout and retry decorator for either

mod dry_run;
mod http;
mod retry;

pub use dry_run::DryRunGenerator;
pub use http::HttpTextGenerator;
pub use retry::RetryingGenerator;
