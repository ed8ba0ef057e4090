//! Checks that decide whether an Arrow type tree survives a Parquet round-trip.
//!
//! Parquet has no union type and cannot represent a struct without fields, at any depth.
//! [`assert_serializable`] walks a [`DataType`] recursively and reports the first offending
//! position using a dotted/bracketed path; [`prune_unsupported_columns`] drops offending
//! top-level columns instead of failing.

use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use tracing::warn;

use crate::error::{UploadError, UploadResult};

/// Fail with [`UploadError::UnsupportedType`] if `data_type` (or anything nested in it)
/// cannot be written to Parquet.
///
/// `path` names the position of `data_type`; nested positions are reported as
/// `path.field`, `path[...]` (list elements and map values) and `path.keys()[...]`
/// (map keys).
pub fn assert_serializable(data_type: &DataType, path: &str) -> UploadResult<()> {
    match data_type {
        DataType::Union(..) => Err(UploadError::unsupported_type(format!(
            "'{path}' is a union ({data_type}); union types cannot be written to Parquet"
        ))),
        DataType::Struct(fields) if fields.is_empty() => Err(UploadError::unsupported_type(format!(
            "'{path}' is a struct with no fields; empty structs cannot be written to Parquet"
        ))),
        DataType::Struct(fields) => {
            for field in fields {
                assert_serializable(field.data_type(), &format!("{path}.{}", field.name()))?;
            }
            Ok(())
        }
        DataType::List(item)
        | DataType::LargeList(item)
        | DataType::FixedSizeList(item, _)
        | DataType::ListView(item)
        | DataType::LargeListView(item) => assert_serializable(item.data_type(), &format!("{path}[...]")),
        DataType::Map(entries, _) => match entries.data_type() {
            DataType::Struct(kv) if kv.len() == 2 => {
                assert_serializable(kv[0].data_type(), &format!("{path}.keys()[...]"))?;
                assert_serializable(kv[1].data_type(), &format!("{path}[...]"))
            }
            other => assert_serializable(other, &format!("{path}[...]")),
        },
        DataType::Dictionary(_, value) => assert_serializable(value, path),
        _ => Ok(()),
    }
}

/// Return `table` without the top-level columns whose type fails [`assert_serializable`].
///
/// Each dropped column is reported with a `warn!` event; the remaining columns keep their
/// order and the row count is unchanged.
pub fn prune_unsupported_columns(table: &RecordBatch) -> UploadResult<RecordBatch> {
    let schema = table.schema();
    let mut keep = Vec::with_capacity(schema.fields().len());
    for (idx, field) in schema.fields().iter().enumerate() {
        match assert_serializable(field.data_type(), field.name()) {
            Ok(()) => keep.push(idx),
            Err(reason) => warn!(
                column = %field.name(),
                %reason,
                "dropping column that cannot be written to Parquet"
            ),
        }
    }

    if keep.len() == schema.fields().len() {
        return Ok(table.clone());
    }
    Ok(table.project(&keep)?)
}

/// Structural schema equality: same field names in the same order with the same data types
/// and nullability. Schema and field metadata are ignored.
pub fn schemas_match(a: &Schema, b: &Schema) -> bool {
    a.fields().len() == b.fields().len()
        && a.fields().iter().zip(b.fields().iter()).all(|(x, y)| {
            x.name() == y.name() && x.data_type() == y.data_type() && x.is_nullable() == y.is_nullable()
        })
}
