//! Transport collaborator: the remote calls an upload is made of.
//!
//! The upload pipeline only talks to a [`DatasetTransport`]. Two implementations ship with the
//! crate:
//!
//! - [`HttpTransport`] (feature `http`): the hosted HTTP API.
//! - [`InMemoryTransport`]: an in-process dataset store for tests and dry runs.
//!
//! Transports are plain values built from an explicit [`ClientConfig`]; there is no global
//! client.

pub mod config;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;

pub use config::ClientConfig;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use memory::{FakeDataset, InMemoryTransport};

use crate::error::TransportError;

/// Result of creating a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatasetResponse {
    /// Server-assigned dataset id.
    pub dataset_id: String,
    /// Maximum number of rows the dataset may hold.
    pub row_limit: usize,
}

/// Result of triggering ingestion of the uploaded data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerIngestResponse {
    pub ingest_job_id: String,
}

/// The remote operations an upload needs, one method per API endpoint.
///
/// Implementations make no attempt to sequence calls; the upload pipeline does that.
pub trait DatasetTransport {
    /// Create an empty dataset and learn its id and row limit.
    fn create_dataset(
        &self,
        name: &str,
        embedding_column: Option<&str>,
    ) -> Result<CreateDatasetResponse, TransportError>;

    /// Upload one serialized Parquet file to the dataset.
    fn upload_dataset_data(&self, dataset_id: &str, data: Vec<u8>) -> Result<(), TransportError>;

    /// Ask the service to ingest everything uploaded so far.
    fn trigger_dataset_ingest(&self, dataset_id: &str) -> Result<TriggerIngestResponse, TransportError>;

    /// Web dashboard URL for a dataset.
    fn dataset_dashboard_url(&self, dataset_id: &str) -> String;
}

impl<T: DatasetTransport + ?Sized> DatasetTransport for &T {
    fn create_dataset(
        &self,
        name: &str,
        embedding_column: Option<&str>,
    ) -> Result<CreateDatasetResponse, TransportError> {
        (**self).create_dataset(name, embedding_column)
    }

    fn upload_dataset_data(&self, dataset_id: &str, data: Vec<u8>) -> Result<(), TransportError> {
        (**self).upload_dataset_data(dataset_id, data)
    }

    fn trigger_dataset_ingest(&self, dataset_id: &str) -> Result<TriggerIngestResponse, TransportError> {
        (**self).trigger_dataset_ingest(dataset_id)
    }

    fn dataset_dashboard_url(&self, dataset_id: &str) -> String {
        (**self).dataset_dashboard_url(dataset_id)
    }
}

/// Derive the web dashboard URL for a dataset from the API base URL.
///
/// `https://api.example.com` becomes `https://app.example.com/dataset/<id>`; the dev API host
/// `://api.dev` maps to `://airtrain.dev`.
pub fn dashboard_url(base_url: &str, dataset_id: &str) -> String {
    let app_url = base_url
        .trim_end_matches('/')
        .replace("://api.dev", "://airtrain.dev")
        .replace("://api.", "://app.");
    format!("{app_url}/dataset/{dataset_id}")
}

#[cfg(test)]
mod tests {
    use super::dashboard_url;

    #[test]
    fn dashboard_url_rewrites_api_host() {
        assert_eq!(
            dashboard_url("https://api.airtrain.ai", "abc"),
            "https://app.airtrain.ai/dataset/abc"
        );
        assert_eq!(
            dashboard_url("https://api.dev.airtrain.ai/", "abc"),
            "https://airtrain.dev.airtrain.ai/dataset/abc"
        );
        assert_eq!(dashboard_url("https://fake.local", "x"), "https://fake.local/dataset/x");
    }
}
