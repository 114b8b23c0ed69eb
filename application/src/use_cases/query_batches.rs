//! Read side of the batch lifecycle: status and results lookups.

use crate::ports::batch_store::{BatchStore, StoreError};
use crate::use_cases::run_batch::RunBatchError;
use simbatch_domain::{Batch, BatchId, BatchRecord, TaskRecord};
use std::sync::Arc;

/// Queries over stored batches. Safe to call while batches are running;
/// readers see every result stored so far.
pub struct QueryBatchesUseCase<S: BatchStore + 'static> {
    store: Arc<S>,
}

impl<S: BatchStore + 'static> Clone for QueryBatchesUseCase<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: BatchStore + 'static> QueryBatchesUseCase<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Current state of a batch, with the results stored so far.
    pub async fn get_batch(&self, id: &BatchId) -> Result<Batch, RunBatchError> {
        self.store
            .get_batch(id)
            .await?
            .ok_or_else(|| RunBatchError::NotFound(id.clone()))
    }

    /// Stored results of a batch, sorted by sequence number.
    pub async fn list_task_results(&self, id: &BatchId) -> Result<Vec<TaskRecord>, RunBatchError> {
        self.store.list_task_results(id).await.map_err(|e| match e {
            StoreError::NotFound(id) => RunBatchError::NotFound(id),
            other => RunBatchError::Store(other),
        })
    }

    /// Stored results that are failures, sorted by sequence number.
    pub async fn list_failures(&self, id: &BatchId) -> Result<Vec<TaskRecord>, RunBatchError> {
        let mut results = self.list_task_results(id).await?;
        results.retain(|r| !r.is_success());
        Ok(results)
    }

    /// All known batches, newest first.
    pub async fn list_batches(&self) -> Result<Vec<BatchRecord>, RunBatchError> {
        Ok(self.store.list_batches().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use simbatch_domain::{BatchSpec, BatchStatus, TaskResult};
    use std::sync::Mutex;

    /// Holds a single batch; everything else is unknown.
    struct SingleBatchStore {
        batch: Mutex<Batch>,
    }

    #[async_trait]
    impl BatchStore for SingleBatchStore {
        async fn create_batch(&self, _record: &BatchRecord) -> Result<(), StoreError> {
            Ok(())
        }

        async fn set_batch_status(
            &self,
            _id: &BatchId,
            _status: BatchStatus,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn note_batch_error(&self, _id: &BatchId, _error: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn save_task_result(
            &self,
            _id: &BatchId,
            _result: &TaskRecord,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get_batch(&self, id: &BatchId) -> Result<Option<Batch>, StoreError> {
            let batch = self.batch.lock().unwrap();
            Ok((batch.id() == id).then(|| batch.clone()))
        }

        async fn list_task_results(&self, id: &BatchId) -> Result<Vec<TaskRecord>, StoreError> {
            let batch = self.batch.lock().unwrap();
            if batch.id() != id {
                return Err(StoreError::NotFound(id.clone()));
            }
            Ok(batch.results().to_vec())
        }

        async fn list_batches(&self) -> Result<Vec<BatchRecord>, StoreError> {
            Ok(vec![self.batch.lock().unwrap().record().clone()])
        }
    }

    fn query() -> QueryBatchesUseCase<SingleBatchStore> {
        let spec = BatchSpec::new("pairs", vec!["a", "b", "c"], 2, 3);
        let mut batch = Batch::new(BatchId::from("known"), spec, 3);
        batch.start().unwrap();
        batch
            .record_result(TaskRecord::new(1, vec![], TaskResult::success("Turn 1: x", 1, vec![])))
            .unwrap();
        batch
            .record_result(TaskRecord::new(3, vec![], TaskResult::failure("boom")))
            .unwrap();
        QueryBatchesUseCase::new(Arc::new(SingleBatchStore {
            batch: Mutex::new(batch),
        }))
    }

    #[tokio::test]
    async fn test_get_running_batch() {
        let batch = query().get_batch(&BatchId::from("known")).await.unwrap();
        assert_eq!(batch.status(), BatchStatus::InProgress);
        assert_eq!(batch.summary().pending, 1);
    }

    #[tokio::test]
    async fn test_list_failures() {
        let failures = query().list_failures(&BatchId::from("known")).await.unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].sequence, 3);
    }

    #[tokio::test]
    async fn test_unknown_batch_is_not_found() {
        let query = query();
        let missing = BatchId::from("missing");

        assert!(matches!(
            query.get_batch(&missing).await,
            Err(RunBatchError::NotFound(_))
        ));
        assert!(matches!(
            query.list_task_results(&missing).await,
            Err(RunBatchError::NotFound(_))
        ));
    }
}
