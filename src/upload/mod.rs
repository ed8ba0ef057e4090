//! Upload orchestration: drive one dataset from creation to ingest.
//!
//! An upload call walks a stream of Arrow tables strictly in order:
//!
//! - the first table fixes the schema; every later table must match it exactly
//! - the embedding column, if any, is validated and its dimension carried forward
//! - each table is cut down to the rows still allowed by the server's row limit, stripped of
//!   columns Parquet cannot hold, serialized and uploaded
//! - once the limit is reached no further input is read
//!
//! If an [`observability::UploadObserver`] is provided, success/failure/alerts are reported
//! to it once the call finishes.

pub mod observability;

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use tracing::{debug, error, info};

use crate::codec::write_parquet;
use crate::embedding::validate_embedding_column;
use crate::error::{UploadError, UploadResult};
use crate::schema::{prune_unsupported_columns, schemas_match};
use crate::transport::DatasetTransport;
use crate::types::DatasetMetadata;

use observability::{severity_for_error, UploadContext, UploadObserver, UploadSeverity, UploadStats};

/// Records per table when uploading record streams.
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Options shared by every `upload_from_*` entry point.
#[derive(Clone)]
pub struct UploadOptions {
    /// Dataset name. Defaults to `My Dataset (<UTC timestamp>)`.
    pub name: Option<String>,
    /// Column holding precomputed embedding vectors.
    pub embedding_column: Option<String>,
    /// Schema for record input. If `None`, it is inferred from the first batch of records.
    pub schema: Option<SchemaRef>,
    /// Records per table on the record path.
    pub max_batch_size: usize,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn UploadObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: UploadSeverity,
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("name", &self.name)
            .field("embedding_column", &self.embedding_column)
            .field("schema", &self.schema)
            .field("max_batch_size", &self.max_batch_size)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            name: None,
            embedding_column: None,
            schema: None,
            max_batch_size: DEFAULT_BATCH_SIZE,
            observer: None,
            alert_at_or_above: UploadSeverity::Critical,
        }
    }
}

/// Upload a stream of Arrow tables as one dataset.
///
/// All tables must share one schema. Tables are consumed lazily; once the server-declared
/// row limit is reached, the remaining input is never read.
///
/// # Errors
///
/// - [`UploadError::Validation`] on a schema mismatch, an invalid embedding column, or when
///   no rows were uploaded at all (no dataset is ingested in that case).
/// - [`UploadError::UnsupportedType`] when the embedding column is not a numeric list.
/// - [`UploadError::Transport`] from the transport, unmodified.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use airtrain::arrow::array::Int64Array;
/// use airtrain::arrow::datatypes::{DataType, Field, Schema};
/// use airtrain::arrow::record_batch::RecordBatch;
/// use airtrain::transport::InMemoryTransport;
/// use airtrain::upload::{upload_from_arrow_tables, UploadOptions};
///
/// # fn main() -> Result<(), airtrain::UploadError> {
/// let schema = Arc::new(Schema::new(vec![Field::new("foo", DataType::Int64, false)]));
/// let table = RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2, 3]))])?;
///
/// let transport = InMemoryTransport::new();
/// let opts = UploadOptions {
///     name: Some("Numbers".to_string()),
///     ..Default::default()
/// };
/// let dataset = upload_from_arrow_tables(&transport, [table], &opts)?;
/// assert_eq!(dataset.size(), 3);
/// # Ok(())
/// # }
/// ```
pub fn upload_from_arrow_tables<T, I>(
    transport: &T,
    tables: I,
    options: &UploadOptions,
) -> UploadResult<DatasetMetadata>
where
    T: DatasetTransport + ?Sized,
    I: IntoIterator<Item = RecordBatch>,
{
    upload_tables(transport, tables.into_iter().map(Ok), options)
}

/// Like [`upload_from_arrow_tables`], for table streams whose production can fail.
///
/// The first `Err` aborts the upload with that error.
pub fn upload_table_results<T, I>(
    transport: &T,
    tables: I,
    options: &UploadOptions,
) -> UploadResult<DatasetMetadata>
where
    T: DatasetTransport + ?Sized,
    I: IntoIterator<Item = UploadResult<RecordBatch>>,
{
    upload_tables(transport, tables.into_iter(), options)
}

pub(crate) fn upload_tables<T, I>(transport: &T, tables: I, options: &UploadOptions) -> UploadResult<DatasetMetadata>
where
    T: DatasetTransport + ?Sized,
    I: Iterator<Item = UploadResult<RecordBatch>>,
{
    let name = options.name.clone().unwrap_or_else(default_dataset_name);
    let mut ctx = UploadContext {
        dataset_name: name,
        dataset_id: None,
    };
    let mut batches = 0;

    let result = run_upload(transport, tables, options, &mut ctx, &mut batches);
    report(options, &ctx, &result, batches);
    result
}

/// Report an error raised before any table was produced, and hand it back.
pub(crate) fn reject(options: &UploadOptions, error: UploadError) -> UploadError {
    let ctx = UploadContext {
        dataset_name: options.name.clone().unwrap_or_else(default_dataset_name),
        dataset_id: None,
    };
    report_failure(options, &ctx, &error);
    error
}

/// Name given to datasets created without one.
pub fn default_dataset_name() -> String {
    format!("My Dataset ({})", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))
}

/// Per-call state: ids, limits and everything fixed by the first table.
struct UploadSession<'a> {
    dataset_id: String,
    row_limit: usize,
    size: usize,
    schema: Option<SchemaRef>,
    embedding_column: Option<&'a str>,
    embedding_dim: Option<usize>,
}

impl UploadSession<'_> {
    fn is_full(&self) -> bool {
        self.size >= self.row_limit
    }

    /// Validate `table` and return the part of it that may still be uploaded.
    fn prepare(&mut self, table: RecordBatch) -> UploadResult<RecordBatch> {
        match &self.schema {
            None => self.schema = Some(table.schema()),
            Some(expected) => {
                if !schemas_match(expected, table.schema_ref()) {
                    error!(expected = ?expected, found = ?table.schema(), "schema mismatch between tables");
                    return Err(UploadError::validation(format!(
                        "All tables must share one schema. Expected {expected:?}, got {:?}",
                        table.schema()
                    )));
                }
            }
        }

        if let Some(column) = self.embedding_column {
            if table.num_rows() > 0 {
                self.embedding_dim = Some(validate_embedding_column(&table, column, self.embedding_dim)?);
            }
        }

        let remaining = self.row_limit.saturating_sub(self.size);
        let table = if table.num_rows() > remaining {
            table.slice(0, remaining)
        } else {
            table
        };
        prune_unsupported_columns(&table)
    }
}

fn run_upload<T, I>(
    transport: &T,
    tables: I,
    options: &UploadOptions,
    ctx: &mut UploadContext,
    batches: &mut usize,
) -> UploadResult<DatasetMetadata>
where
    T: DatasetTransport + ?Sized,
    I: Iterator<Item = UploadResult<RecordBatch>>,
{
    let embedding_column = options.embedding_column.as_deref();
    let created = transport.create_dataset(&ctx.dataset_name, embedding_column)?;
    info!(
        dataset = %ctx.dataset_name,
        dataset_id = %created.dataset_id,
        row_limit = created.row_limit,
        "created dataset"
    );
    ctx.dataset_id = Some(created.dataset_id.clone());

    let mut session = UploadSession {
        dataset_id: created.dataset_id,
        row_limit: created.row_limit,
        size: 0,
        schema: None,
        embedding_column,
        embedding_dim: None,
    };

    if !session.is_full() {
        for table in tables {
            let table = session.prepare(table?)?;
            let rows = table.num_rows();
            if rows > 0 {
                let data = write_parquet(&table)?;
                debug!(dataset_id = %session.dataset_id, rows, bytes = data.len(), "uploading batch");
                transport.upload_dataset_data(&session.dataset_id, data)?;
                session.size += rows;
                *batches += 1;
            }
            if session.is_full() {
                info!(
                    dataset_id = %session.dataset_id,
                    row_limit = session.row_limit,
                    "row limit reached; remaining input is not read"
                );
                break;
            }
        }
    }

    if session.size == 0 {
        return Err(UploadError::validation(
            "No rows to upload. Datasets must contain at least one row.",
        ));
    }

    let ingest = transport.trigger_dataset_ingest(&session.dataset_id)?;
    info!(
        dataset_id = %session.dataset_id,
        ingest_job_id = %ingest.ingest_job_id,
        rows = session.size,
        "triggered ingest"
    );
    let url = transport.dataset_dashboard_url(&session.dataset_id);
    DatasetMetadata::new(ctx.dataset_name.clone(), session.dataset_id, url, session.size)
}

fn report(options: &UploadOptions, ctx: &UploadContext, result: &UploadResult<DatasetMetadata>, batches: usize) {
    match result {
        Ok(ds) => {
            if let Some(obs) = options.observer.as_ref() {
                obs.on_success(ctx, UploadStats { rows: ds.size(), batches });
            }
        }
        Err(e) => report_failure(options, ctx, e),
    }
}

fn report_failure(options: &UploadOptions, ctx: &UploadContext, e: &UploadError) {
    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    let sev = severity_for_error(e);
    obs.on_failure(ctx, sev, e);
    if sev >= options.alert_at_or_above {
        obs.on_alert(ctx, sev, e);
    }
}
