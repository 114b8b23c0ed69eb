//! Storage configuration from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use simbatch_domain::{ConfigIssue, ConfigIssueCode};
use std::path::PathBuf;

/// Which batch store to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// One directory per batch under `data_dir`
    File,
    /// Process memory only; batches are lost on exit
    Memory,
}

/// Raw storage configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// `"file"` or `"memory"`
    pub backend: String,
    /// Root directory for the file backend
    pub data_dir: Option<PathBuf>,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            data_dir: None,
        }
    }
}

impl FileStorageConfig {
    /// Parse the backend name. Unknown names fall back to the file backend
    /// with a warning.
    pub fn parse_backend(&self) -> (StorageBackend, Vec<ConfigIssue>) {
        match self.backend.trim().to_lowercase().as_str() {
            "file" | "fs" => (StorageBackend::File, vec![]),
            "memory" | "mem" => (StorageBackend::Memory, vec![]),
            _ => (
                StorageBackend::File,
                vec![ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "storage.backend".to_string(),
                        value: self.backend.clone(),
                        valid_values: vec!["file".to_string(), "memory".to_string()],
                    },
                    format!(
                        "storage.backend: unknown value '{}', falling back to 'file'",
                        self.backend
                    ),
                )],
            ),
        }
    }

    /// Directory for the file backend.
    ///
    /// `$XDG_DATA_HOME/simbatch/batches` unless configured, or
    /// `./.simbatch/batches` when no data directory is known.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("simbatch").join("batches"))
                .unwrap_or_else(|| PathBuf::from(".simbatch").join("batches"))
        })
    }
}
