//! `airtrain` validates tabular data, batches it and uploads it as a dataset, one Parquet
//! file per batch, to a remote dataset-ingestion service.
//!
//! Every entry point ends in the same pipeline ([`upload::upload_from_arrow_tables`]):
//!
//! 1. create a dataset and learn its row limit
//! 2. for each Arrow table: check it has the schema of the first table, validate the embedding
//!    column (if any), truncate to the remaining row budget, drop columns Parquet cannot store
//! 3. serialize to Parquet and upload
//! 4. stop reading input at the row limit, then trigger ingest
//!
//! ## Inputs
//!
//! - **Arrow tables**: [`upload::upload_from_arrow_tables`]
//! - **Records** (JSON-like maps, e.g. `serde_json::Value`): [`adapters::upload_from_dicts`]
//! - **Dataframes**: [`adapters::upload_from_dataframes`], and
//!   `adapters::upload_from_polars` with the Cargo feature `polars` (on by default)
//! - **Document nodes** (any `serde::Serialize`): [`adapters::upload_from_nodes`]
//!
//! ## Transports
//!
//! Uploads go through a [`transport::DatasetTransport`]. `transport::HttpTransport` (feature
//! `http`, on by default) talks to the hosted API and reads its key from `AIRTRAIN_API_KEY`;
//! [`transport::InMemoryTransport`] keeps datasets in process memory for tests.
//!
//! ## Quick example: upload records
//!
//! ```
//! use airtrain::adapters::upload_from_dicts;
//! use airtrain::transport::InMemoryTransport;
//! use airtrain::upload::UploadOptions;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), airtrain::UploadError> {
//! // Against the hosted API: `airtrain::transport::HttpTransport::from_env()?`.
//! let transport = InMemoryTransport::new().with_row_limit(500);
//! let records = (0..).map(|i| json!({"id": i, "text": format!("document {i}")}));
//! let opts = UploadOptions {
//!     name: Some("My documents".to_string()),
//!     ..Default::default()
//! };
//! // The stream is unbounded; reading stops at the row limit.
//! let dataset = upload_from_dicts(&transport, records, &opts)?;
//! assert_eq!(dataset.size(), 500);
//! # Ok(())
//! # }
//! ```
//!
//! ## Embeddings
//!
//! Name the column holding precomputed vectors; every row must hold a numeric vector of one
//! shared dimension, with no nulls:
//!
//! ```
//! use airtrain::adapters::upload_from_dicts;
//! use airtrain::transport::InMemoryTransport;
//! use airtrain::upload::UploadOptions;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), airtrain::UploadError> {
//! let transport = InMemoryTransport::new();
//! let records = vec![
//!     json!({"text": "a", "vector": [0.1, 0.2, 0.3]}),
//!     json!({"text": "b", "vector": [0.4, 0.5, 0.6]}),
//! ];
//! let opts = UploadOptions {
//!     embedding_column: Some("vector".to_string()),
//!     ..Default::default()
//! };
//! let dataset = upload_from_dicts(&transport, records, &opts)?;
//! assert_eq!(dataset.size(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! The library emits `tracing` events (pruned columns, schema mismatches, per-batch uploads)
//! and never installs a subscriber. For per-upload hooks, set
//! [`upload::UploadOptions::observer`] to an [`upload::observability::UploadObserver`] such as
//! [`upload::observability::TracingObserver`].

pub mod adapters;
pub mod batch;
pub mod codec;
pub mod embedding;
pub mod error;
pub mod schema;
pub mod transport;
pub mod types;
pub mod upload;

pub use arrow;

pub use error::{TransportError, UploadError, UploadResult};
pub use types::{DatasetMetadata, Value};
