use crate::batch::{batches_to_tables, to_batches};
use crate::error::UploadResult;
use crate::transport::DatasetTransport;
use crate::types::{DatasetMetadata, Value};
use crate::upload::{reject, upload_tables, UploadOptions};

/// Upload a stream of records as one dataset.
///
/// Records are grouped `options.max_batch_size` at a time; each group becomes one table.
/// The schema is `options.schema`, or inferred from the first group. The stream is read
/// lazily, so an unbounded stream is fine: reading stops at the server's row limit.
///
/// # Errors
///
/// Fails with [`crate::UploadError::Validation`] if `max_batch_size` is 0 or a record is not
/// a mapping, and otherwise as [`crate::upload::upload_from_arrow_tables`] does.
///
/// # Examples
///
/// ```
/// use airtrain::adapters::upload_from_dicts;
/// use airtrain::transport::InMemoryTransport;
/// use airtrain::upload::UploadOptions;
/// use serde_json::json;
///
/// # fn main() -> Result<(), airtrain::UploadError> {
/// let transport = InMemoryTransport::new();
/// let records = (0..10).map(|i| json!({"id": i, "text": format!("row {i}")}));
/// let dataset = upload_from_dicts(&transport, records, &UploadOptions::default())?;
/// assert_eq!(dataset.size(), 10);
/// # Ok(())
/// # }
/// ```
pub fn upload_from_dicts<T, I>(transport: &T, records: I, options: &UploadOptions) -> UploadResult<DatasetMetadata>
where
    T: DatasetTransport + ?Sized,
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let groups = to_batches(records, options.max_batch_size).map_err(|e| reject(options, e))?;
    let tables = batches_to_tables(groups, options.schema.clone());
    upload_tables(transport, tables, options)
}
