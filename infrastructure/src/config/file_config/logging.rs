//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL file receiving one structured record per batch event
    pub event_log: Option<PathBuf>,
    /// Directory for daily-rotated diagnostic logs
    pub log_dir: Option<PathBuf>,
}
