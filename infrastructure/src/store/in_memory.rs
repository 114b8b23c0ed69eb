//! In-memory batch store.

use async_trait::async_trait;
use simbatch_application::ports::batch_store::{BatchStore, StoreError};
use simbatch_domain::{Batch, BatchId, BatchRecord, BatchStatus, TaskRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Batches held in process memory. Used for tests, `--dry-run` and
/// `storage.backend = "memory"`.
#[derive(Default)]
pub struct InMemoryBatchStore {
    batches: RwLock<HashMap<BatchId, Entry>>,
}

struct Entry {
    record: BatchRecord,
    results: HashMap<u32, TaskRecord>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BatchStore for InMemoryBatchStore {
    async fn create_batch(&self, record: &BatchRecord) -> Result<(), StoreError> {
        let mut batches = self.batches.write().await;
        match batches.get(&record.id) {
            Some(existing) if existing.record == *record => Ok(()),
            Some(_) => Err(StoreError::AlreadyExists(record.id.clone())),
            None => {
                batches.insert(
                    record.id.clone(),
                    Entry {
                        record: record.clone(),
                        results: HashMap::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn set_batch_status(&self, id: &BatchId, status: BatchStatus) -> Result<(), StoreError> {
        let mut batches = self.batches.write().await;
        let entry = batches
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        entry.record.apply_status(status)?;
        Ok(())
    }

    async fn note_batch_error(&self, id: &BatchId, error: &str) -> Result<(), StoreError> {
        let mut batches = self.batches.write().await;
        let entry = batches
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        entry.record.note_error(error);
        Ok(())
    }

    async fn save_task_result(&self, id: &BatchId, result: &TaskRecord) -> Result<(), StoreError> {
        let mut batches = self.batches.write().await;
        let entry = batches
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        entry.results.insert(result.sequence, result.clone());
        Ok(())
    }

    async fn get_batch(&self, id: &BatchId) -> Result<Option<Batch>, StoreError> {
        let batches = self.batches.read().await;
        Ok(batches.get(id).map(|entry| {
            Batch::from_parts(entry.record.clone(), entry.results.values().cloned().collect())
        }))
    }

    async fn list_task_results(&self, id: &BatchId) -> Result<Vec<TaskRecord>, StoreError> {
        let batches = self.batches.read().await;
        let entry = batches
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let mut results: Vec<TaskRecord> = entry.results.values().cloned().collect();
        results.sort_by_key(|r| r.sequence);
        Ok(results)
    }

    async fn list_batches(&self) -> Result<Vec<BatchRecord>, StoreError> {
        let batches = self.batches.read().await;
        let mut records: Vec<BatchRecord> = batches.values().map(|e| e.record.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
