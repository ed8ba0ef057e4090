//! In-process [`DatasetTransport`] that keeps datasets in memory.
//!
//! Uploaded Parquet parts are stored as-is; triggering ingest reads them back and concatenates
//! them into a single "ingested" table, which tests can inspect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;

use crate::codec::read_parquet_table;
use crate::error::TransportError;

use super::{dashboard_url, CreateDatasetResponse, DatasetTransport, TriggerIngestResponse};

/// Row limit handed out by [`InMemoryTransport::new`].
pub const DEFAULT_FAKE_ROW_LIMIT: usize = 100;

/// State of one dataset held by an [`InMemoryTransport`].
#[derive(Debug, Clone, Default)]
pub struct FakeDataset {
    pub id: String,
    pub name: String,
    pub embedding_column: Option<String>,
    /// Raw Parquet files in upload order.
    pub source_data: Vec<Vec<u8>>,
    pub ingest_job_id: Option<String>,
    /// Concatenation of all parts, set by the last ingest trigger.
    pub ingested: Option<RecordBatch>,
}

/// A dataset store living entirely in process memory.
#[derive(Debug)]
pub struct InMemoryTransport {
    base_url: String,
    row_limit: usize,
    next_id: AtomicU64,
    datasets: Mutex<HashMap<String, FakeDataset>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            base_url: "https://fake.local".to_string(),
            row_limit: DEFAULT_FAKE_ROW_LIMIT,
            next_id: AtomicU64::new(1),
            datasets: Mutex::new(HashMap::new()),
        }
    }

    /// Set the row limit returned for every created dataset.
    pub fn with_row_limit(mut self, row_limit: usize) -> Self {
        self.row_limit = row_limit;
        self
    }

    /// Snapshot of a dataset by id.
    pub fn dataset(&self, dataset_id: &str) -> Option<FakeDataset> {
        self.lock().get(dataset_id).cloned()
    }

    /// Number of datasets created so far.
    pub fn dataset_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FakeDataset>> {
        self.datasets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetTransport for InMemoryTransport {
    fn create_dataset(
        &self,
        name: &str,
        embedding_column: Option<&str>,
    ) -> Result<CreateDatasetResponse, TransportError> {
        let dataset_id = format!("ds-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.lock().insert(
            dataset_id.clone(),
            FakeDataset {
                id: dataset_id.clone(),
                name: name.to_string(),
                embedding_column: embedding_column.map(str::to_string),
                ..Default::default()
            },
        );
        Ok(CreateDatasetResponse {
            dataset_id,
            row_limit: self.row_limit,
        })
    }

    fn upload_dataset_data(&self, dataset_id: &str, data: Vec<u8>) -> Result<(), TransportError> {
        let mut datasets = self.lock();
        let dataset = datasets
            .get_mut(dataset_id)
            .ok_or_else(|| TransportError::NotFound(format!("Dataset '{dataset_id}' was not created first")))?;
        dataset.source_data.push(data);
        Ok(())
    }

    fn trigger_dataset_ingest(&self, dataset_id: &str) -> Result<TriggerIngestResponse, TransportError> {
        let mut datasets = self.lock();
        let dataset = datasets
            .get_mut(dataset_id)
            .ok_or_else(|| TransportError::NotFound(format!("Dataset '{dataset_id}' was not created first")))?;

        let mut parts = Vec::with_capacity(dataset.source_data.len());
        for source in &dataset.source_data {
            let part = read_parquet_table(source.clone())
                .map_err(|e| TransportError::Server(format!("Unreadable source data: {e}")))?;
            parts.push(part);
        }
        dataset.ingested = match parts.first() {
            Some(first) => Some(
                concat_batches(&first.schema(), &parts)
                    .map_err(|e| TransportError::Server(format!("Source parts do not share a schema: {e}")))?,
            ),
            None => None,
        };

        let job_id = format!("job-{dataset_id}-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        dataset.ingest_job_id = Some(job_id.clone());
        Ok(TriggerIngestResponse { ingest_job_id: job_id })
    }

    fn dataset_dashboard_url(&self, dataset_id: &str) -> String {
        dashboard_url(&self.base_url, dataset_id)
    }
}
