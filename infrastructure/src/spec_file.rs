//! Loading batch specs from disk.
//!
//! The format follows the file extension: `.toml` or `.json`.

use simbatch_domain::BatchSpec;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecFileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported spec file '{0}' (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),
}

/// Read a [`BatchSpec`] from a `.toml` or `.json` file.
///
/// Only the file format is checked here; the spec itself is validated when
/// the batch is submitted.
pub fn load_batch_spec(path: impl AsRef<Path>) -> Result<BatchSpec, SpecFileError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let is_toml = match extension.as_deref() {
        Some("toml") => true,
        Some("json") => false,
        _ => return Err(SpecFileError::UnsupportedFormat(path.to_path_buf())),
    };

    let text = std::fs::read_to_string(path).map_err(|source| SpecFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if is_toml {
        toml::from_str(&text).map_err(|source| SpecFileError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(&text).map_err(|source| SpecFileError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_toml_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tavern.toml");
        std::fs::write(
            &path,
            r#"
name = "tavern"
entities = ["innkeeper", "bard", "guard", "thief"]
interaction_size = 2
task_count = 5
turns_per_round = 4
rounds_per_task = 3
context = "A rainy evening"
seed = 42

[metadata]
author = "ops"
"#,
        )
        .unwrap();

        let spec = load_batch_spec(&path).unwrap();
        assert_eq!(spec.name, "tavern");
        assert_eq!(spec.entities.len(), 4);
        assert_eq!(spec.interaction_size, 2);
        assert_eq!(spec.rounds_per_task, 3);
        assert_eq!(spec.seed, Some(42));
        assert_eq!(spec.metadata["author"], "ops");
    }

    #[test]
    fn test_load_json_spec_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.JSON");
        std::fs::write(
            &path,
            r#"{"name":"pairs","entities":["a","b","c"],"interaction_size":2,"task_count":2,"turns_per_round":1}"#,
        )
        .unwrap();

        let spec = load_batch_spec(&path).unwrap();
        assert_eq!(spec.rounds_per_task, 1);
        assert!(spec.context.is_empty());
        assert!(spec.seed.is_none());
    }

    #[test]
    fn test_errors() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("spec.yaml");
        std::fs::write(&yaml, "name: x").unwrap();
        assert!(matches!(
            load_batch_spec(&yaml),
            Err(SpecFileError::UnsupportedFormat(_))
        ));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "name = ").unwrap();
        assert!(matches!(load_batch_spec(&broken), Err(SpecFileError::Toml { .. })));

        assert!(matches!(
            load_batch_spec(dir.path().join("missing.json")),
            Err(SpecFileError::Io { .. })
        ));
    }
}
