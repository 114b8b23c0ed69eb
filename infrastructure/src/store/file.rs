//! File-backed batch store.
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/
//!   <batch-id>/
//!     batch.json          header and status
//!     results/
//!       000001.json       one file per finished task
//!       000002.json
//! ```
//!
//! Every file is written to a temporary name and renamed into place, so a
//! reader never sees a half-written record and a crash mid-batch leaves all
//! finished tasks on disk.
//!
//! Batch ids come from the command line, so an id is only accepted as a
//! single plain path component under the data directory.

use async_trait::async_trait;
use serde::Serialize;
use simbatch_application::ports::batch_store::{BatchStore, StoreError};
use simbatch_domain::{Batch, BatchId, BatchRecord, BatchStatus, TaskRecord};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const HEADER_FILE: &str = "batch.json";
const RESULTS_DIR: &str = "results";

pub struct FileBatchStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles on headers
    header_lock: Mutex<()>,
}

impl FileBatchStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            header_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn batch_dir(&self, id: &BatchId) -> Result<PathBuf, StoreError> {
        let name = id.as_str();
        let mut components = Path::new(name).components();
        let is_plain = !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !is_plain {
            return Err(StoreError::InvalidId(id.clone()));
        }
        Ok(self.root.join(name))
    }

    fn header_path(&self, id: &BatchId) -> Result<PathBuf, StoreError> {
        Ok(self.batch_dir(id)?.join(HEADER_FILE))
    }

    fn result_path(&self, id: &BatchId, sequence: u32) -> Result<PathBuf, StoreError> {
        Ok(self
            .batch_dir(id)?
            .join(RESULTS_DIR)
            .join(format!("{:06}.json", sequence)))
    }

    async fn read_header(&self, id: &BatchId) -> Result<Option<BatchRecord>, StoreError> {
        read_json(&self.header_path(id)?).await
    }

    async fn require_header(&self, id: &BatchId) -> Result<BatchRecord, StoreError> {
        self.read_header(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn read_results(&self, id: &BatchId) -> Result<Vec<TaskRecord>, StoreError> {
        let dir = self.batch_dir(id)?.join(RESULTS_DIR);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut results = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match read_json::<TaskRecord>(&path).await {
                Ok(Some(record)) => results.push(record),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable result {}: {}", path.display(), e),
            }
        }
        results.sort_by_key(|r| r.sequence);
        Ok(results)
    }
}

#[async_trait]
impl BatchStore for FileBatchStore {
    async fn create_batch(&self, record: &BatchRecord) -> Result<(), StoreError> {
        let _guard = self.header_lock.lock().await;

        if let Some(existing) = self.read_header(&record.id).await? {
            return if existing == *record {
                Ok(())
            } else {
                Err(StoreError::AlreadyExists(record.id.clone()))
            };
        }

        fs::create_dir_all(self.batch_dir(&record.id)?.join(RESULTS_DIR)).await?;
        write_json_atomic(&self.header_path(&record.id)?, record).await?;
        debug!("Stored batch {} under {}", record.id, self.root.display());
        Ok(())
    }

    async fn set_batch_status(&self, id: &BatchId, status: BatchStatus) -> Result<(), StoreError> {
        let _guard = self.header_lock.lock().await;

        let mut record = self.require_header(id).await?;
        if record.status == status {
            return Ok(());
        }
        record.apply_status(status)?;
        write_json_atomic(&self.header_path(id)?, &record).await
    }

    async fn note_batch_error(&self, id: &BatchId, error: &str) -> Result<(), StoreError> {
        let _guard = self.header_lock.lock().await;

        let mut record = self.require_header(id).await?;
        let before = record.error.clone();
        record.note_error(error);
        if record.error == before {
            return Ok(());
        }
        write_json_atomic(&self.header_path(id)?, &record).await
    }

    async fn save_task_result(&self, id: &BatchId, result: &TaskRecord) -> Result<(), StoreError> {
        if !fs::try_exists(self.header_path(id)?).await? {
            return Err(StoreError::NotFound(id.clone()));
        }
        write_json_atomic(&self.result_path(id, result.sequence)?, result).await
    }

    async fn get_batch(&self, id: &BatchId) -> Result<Option<Batch>, StoreError> {
        let Some(record) = self.read_header(id).await? else {
            return Ok(None);
        };
        let results = self.read_results(id).await?;
        Ok(Some(Batch::from_parts(record, results)))
    }

    async fn list_task_results(&self, id: &BatchId) -> Result<Vec<TaskRecord>, StoreError> {
        self.require_header(id).await?;
        self.read_results(id).await
    }

    async fn list_batches(&self) -> Result<Vec<BatchRecord>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let header = entry.path().join(HEADER_FILE);
            match read_json::<BatchRecord>(&header).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable batch {}: {}", header.display(), e),
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `value` next to `path` and rename it into place.
async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&tmp, &bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbatch_domain::{BatchSpec, TaskResult};

    fn record() -> BatchRecord {
        let spec = BatchSpec::new("demo", vec!["a", "b", "c"], 2, 3)
            .with_metadata("scenario", serde_json::json!("harbour"));
        Batch::new(BatchId::generate(), spec, 3).record().clone()
    }

    fn result(sequence: u32, ok: bool) -> TaskRecord {
        let outcome = if ok {
            TaskResult::success("Turn 1: x", 1, vec![])
        } else {
            TaskResult::round_failure("timeout", 1)
        };
        TaskRecord::new(sequence, vec!["a".into(), "b".into()], outcome)
    }

    #[tokio::test]
    async fn test_results_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let record = record();
        let id = record.id.clone();

        {
            let store = FileBatchStore::new(dir.path());
            store.create_batch(&record).await.unwrap();
            store.set_batch_status(&id, BatchStatus::InProgress).await.unwrap();
            store.save_task_result(&id, &result(2, true)).await.unwrap();
            store.save_task_result(&id, &result(1, false)).await.unwrap();
        }

        let reopened = FileBatchStore::new(dir.path());
        let batch = reopened.get_batch(&id).await.unwrap().unwrap();
        assert_eq!(batch.status(), BatchStatus::InProgress);
        assert_eq!(batch.spec().metadata["scenario"], "harbour");

        let results = reopened.list_task_results(&id).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sequence, 1);
        assert!(!results[0].is_success());
        assert!(results[1].is_success());
    }

    #[tokio::test]
    async fn test_layout_and_no_temp_files_left() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBatchStore::new(dir.path());
        let record = record();
        let id = record.id.clone();

        store.create_batch(&record).await.unwrap();
        store.set_batch_status(&id, BatchStatus::InProgress).await.unwrap();
        store.save_task_result(&id, &result(7, true)).await.unwrap();

        let batch_dir = dir.path().join(id.as_str());
        assert!(batch_dir.join("batch.json").exists());
        assert!(batch_dir.join("results").join("000007.json").exists());

        let leftovers: Vec<_> = std::fs::read_dir(batch_dir.join("results"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_writes_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBatchStore::new(dir.path());
        let record = record();
        let id = record.id.clone();

        store.create_batch(&record).await.unwrap();
        store.create_batch(&record).await.unwrap();
        store.set_batch_status(&id, BatchStatus::InProgress).await.unwrap();
        store.save_task_result(&id, &result(1, true)).await.unwrap();
        store.save_task_result(&id, &result(1, true)).await.unwrap();
        store.set_batch_status(&id, BatchStatus::Failed).await.unwrap();
        let finished = store.get_batch(&id).await.unwrap().unwrap().record().finished_at;
        store.set_batch_status(&id, BatchStatus::Failed).await.unwrap();

        let batch = store.get_batch(&id).await.unwrap().unwrap();
        assert_eq!(batch.results().len(), 1);
        assert_eq!(batch.record().finished_at, finished);
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBatchStore::new(dir.path());
        let record = record();
        let id = record.id.clone();

        store.create_batch(&record).await.unwrap();
        store.set_batch_status(&id, BatchStatus::InProgress).await.unwrap();
        store.set_batch_status(&id, BatchStatus::Completed).await.unwrap();

        assert!(matches!(
            store.set_batch_status(&id, BatchStatus::InProgress).await,
            Err(StoreError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_list_batches_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBatchStore::new(dir.path());
        assert!(store.list_batches().await.unwrap().is_empty());

        let older = record();
        let mut newer = record();
        newer.created_at = older.created_at + chrono::Duration::seconds(5);
        store.create_batch(&older).await.unwrap();
        store.create_batch(&newer).await.unwrap();
        std::fs::create_dir(dir.path().join("not-a-batch")).unwrap();

        let listed = store.list_batches().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
    }

    #[tokio::test]
    async fn test_unknown_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBatchStore::new(dir.path());
        let missing = BatchId::from("missing");

        assert!(store.get_batch(&missing).await.unwrap().is_none());
        assert!(matches!(
            store.list_task_results(&missing).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.save_task_result(&missing, &result(1, true)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ids_outside_data_dir_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("batches");
        let store = FileBatchStore::new(&root);

        // A readable header one level above the data directory
        let record = record();
        std::fs::create_dir_all(dir.path().join("outside")).unwrap();
        std::fs::write(
            dir.path().join("outside").join("batch.json"),
            serde_json::to_vec(&record).unwrap(),
        )
        .unwrap();

        for raw in ["../outside", "..", ".", "", "/etc", "a/b", "a\\b", ".hidden"] {
            let id = BatchId::from(raw);
            assert!(
                matches!(store.get_batch(&id).await, Err(StoreError::InvalidId(_))),
                "id {:?} was accepted",
                raw
            );
            assert!(matches!(
                store.list_task_results(&id).await,
                Err(StoreError::InvalidId(_))
            ));
            assert!(matches!(
                store.save_task_result(&id, &result(1, true)).await,
                Err(StoreError::InvalidId(_))
            ));
        }
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_corrupt_result_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBatchStore::new(dir.path());
        let record = record();
        let id = record.id.clone();

        store.create_batch(&record).await.unwrap();
        store.set_batch_status(&id, BatchStatus::InProgress).await.unwrap();
        store.save_task_result(&id, &result(1, true)).await.unwrap();
        store.save_task_result(&id, &result(3, false)).await.unwrap();
        std::fs::write(
            dir.path().join(id.as_str()).join("results").join("000002.json"),
            b"{ not json",
        )
        .unwrap();

        let results = store.list_task_results(&id).await.unwrap();
        let sequences: Vec<u32> = results.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 3]);

        let batch = store.get_batch(&id).await.unwrap().unwrap();
        assert_eq!(batch.results().len(), 2);
        assert_eq!(batch.summary().pending, 1);
    }

    #[tokio::test]
    async fn test_note_batch_error_is_persisted_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBatchStore::new(dir.path());
        let record = record();
        let id = record.id.clone();

        store.create_batch(&record).await.unwrap();
        store.set_batch_status(&id, BatchStatus::InProgress).await.unwrap();
        store.note_batch_error(&id, "result #2 not stored").await.unwrap();
        store.note_batch_error(&id, "result #2 not stored").await.unwrap();
        store.set_batch_status(&id, BatchStatus::Partial).await.unwrap();

        let reopened = FileBatchStore::new(dir.path());
        let batch = reopened.get_batch(&id).await.unwrap().unwrap();
        assert_eq!(batch.status(), BatchStatus::Partial);
        assert_eq!(batch.error(), Some("result #2 not stored"));
    }
}
