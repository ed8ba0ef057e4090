//! Grouping of record streams into fixed-size batches and conversion into Arrow tables.
//!
//! Both steps are lazy: nothing is pulled from the input until the caller asks for the next
//! group or table, so unbounded record streams can be batched safely.

use std::iter::Fuse;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Fields, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use arrow::record_batch::RecordBatch;

use crate::error::{UploadError, UploadResult};
use crate::types::Value;

/// Iterator returned by [`to_batches`].
#[derive(Debug)]
pub struct Batches<I: Iterator> {
    inner: Fuse<I>,
    max_batch_size: usize,
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let group: Vec<I::Item> = self.inner.by_ref().take(self.max_batch_size).collect();
        if group.is_empty() { None } else { Some(group) }
    }
}

/// Split `items` into consecutive groups of at most `max_batch_size`, preserving order.
///
/// The last group may be shorter; an empty input yields no groups at all.
pub fn to_batches<I: IntoIterator>(items: I, max_batch_size: usize) -> UploadResult<Batches<I::IntoIter>> {
    if max_batch_size < 1 {
        return Err(UploadError::validation(format!(
            "max_batch_size must be at least 1, got {max_batch_size}"
        )));
    }
    Ok(Batches {
        inner: items.into_iter().fuse(),
        max_batch_size,
    })
}

/// Turns groups of records into tables sharing one schema.
///
/// Holds the caller's schema, or the one inferred from the first group.
#[derive(Debug, Default)]
pub(crate) struct TableBuilder {
    schema: Option<SchemaRef>,
}

impl TableBuilder {
    pub(crate) fn new(schema: Option<SchemaRef>) -> Self {
        Self { schema }
    }

    pub(crate) fn build<V: Into<Value>>(&mut self, group: Vec<V>) -> UploadResult<RecordBatch> {
        let mut rows: Vec<serde_json::Value> = Vec::with_capacity(group.len());
        for (idx, item) in group.into_iter().enumerate() {
            let value: Value = item.into();
            if !matches!(value, Value::Map(_)) {
                return Err(UploadError::validation(format!(
                    "Expected every record to be a mapping; item {idx} of the batch is a {} ({value:?})",
                    value.type_name()
                )));
            }
            rows.push(serde_json::Value::from(&value));
        }

        let schema = match &self.schema {
            Some(schema) => {
                let found = infer_group_schema(&rows)?;
                for field in found.fields() {
                    if let Ok(target) = schema.field_with_name(field.name()) {
                        check_lossless(field.name(), target.data_type(), field.data_type())?;
                    }
                }
                schema.clone()
            }
            None => {
                let inferred = Arc::new(infer_group_schema(&rows)?);
                self.schema = Some(inferred.clone());
                inferred
            }
        };

        // Keys missing from a record decode as null; keys outside the schema are ignored.
        let mut decoder = ReaderBuilder::new(schema.clone())
            .with_batch_size(rows.len().max(1))
            .build_decoder()?;
        decoder.serialize(&rows)?;
        Ok(decoder.flush()?.unwrap_or_else(|| RecordBatch::new_empty(schema)))
    }
}

/// Infer the types of one group of rows.
///
/// Integer columns holding values above `i64::MAX` are typed `UInt64` instead of `Float64`.
fn infer_group_schema(rows: &[serde_json::Value]) -> UploadResult<Schema> {
    let inferred = infer_json_schema_from_iterator(rows.iter().map(Ok::<_, ArrowError>))?;
    let rows: Vec<&serde_json::Value> = rows.iter().collect();
    Ok(Schema::new(with_unsigned_fields(inferred.fields(), &rows)))
}

fn with_unsigned_fields(fields: &Fields, values: &[&serde_json::Value]) -> Fields {
    fields
        .iter()
        .map(|field| {
            let children: Vec<&serde_json::Value> = values.iter().filter_map(|v| v.get(field.name())).collect();
            Field::clone(field).with_data_type(with_unsigned(field.data_type(), &children))
        })
        .collect()
}

fn with_unsigned(data_type: &DataType, values: &[&serde_json::Value]) -> DataType {
    match data_type {
        DataType::Float64 if holds_large_unsigned(values) => DataType::UInt64,
        DataType::List(item) => {
            let items: Vec<&serde_json::Value> = values
                .iter()
                .flat_map(|v| match *v {
                    serde_json::Value::Array(items) => items.as_slice(),
                    scalar => std::slice::from_ref(scalar),
                })
                .collect();
            let item_type = with_unsigned(item.data_type(), &items);
            DataType::List(Arc::new(Field::clone(item).with_data_type(item_type)))
        }
        DataType::Struct(fields) => DataType::Struct(with_unsigned_fields(fields, values)),
        other => other.clone(),
    }
}

/// True if every non-null value is a non-negative integer and one of them exceeds `i64::MAX`.
fn holds_large_unsigned(values: &[&serde_json::Value]) -> bool {
    let mut beyond_i64 = false;
    for value in values {
        match value {
            serde_json::Value::Null => {}
            serde_json::Value::Number(n) if n.is_u64() => beyond_i64 |= !n.is_i64(),
            _ => return false,
        }
    }
    beyond_i64
}

/// Fail unless values inferred as `found` fit in a `target` column without losing data.
///
/// Integers widen to any numeric or temporal type (range is checked while decoding) and
/// nulls fit anywhere. Floats never narrow to integers, and strings never become numbers
/// or booleans.
fn check_lossless(path: &str, target: &DataType, found: &DataType) -> Result<(), ArrowError> {
    let fits = match (found, target) {
        (DataType::Null, _) => true,
        _ if found == target => true,
        (DataType::Int64 | DataType::UInt64, t) => {
            t.is_integer()
                || t.is_floating()
                || t.is_temporal()
                || matches!(t, DataType::Decimal128(..) | DataType::Decimal256(..))
        }
        (DataType::Float64, t) => {
            t.is_floating() || matches!(t, DataType::Decimal128(..) | DataType::Decimal256(..))
        }
        (DataType::Utf8, t) => matches!(t, DataType::LargeUtf8 | DataType::Utf8View),
        (
            DataType::List(item),
            DataType::List(t) | DataType::LargeList(t) | DataType::FixedSizeList(t, _),
        ) => return check_lossless(&format!("{path}[]"), t.data_type(), item.data_type()),
        (DataType::Struct(fields), DataType::Struct(targets)) => {
            for field in fields {
                if let Some((_, t)) = targets.find(field.name()) {
                    check_lossless(&format!("{path}.{}", field.name()), t.data_type(), field.data_type())?;
                }
            }
            return Ok(());
        }
        (DataType::Struct(fields), DataType::Map(entries, _)) => {
            if let DataType::Struct(kv) = entries.data_type() {
                if let Some(value) = kv.get(1) {
                    for field in fields {
                        check_lossless(&format!("{path}.{}", field.name()), value.data_type(), field.data_type())?;
                    }
                }
            }
            return Ok(());
        }
        _ => false,
    };
    if fits {
        Ok(())
    } else {
        Err(ArrowError::InvalidArgumentError(format!(
            "Column '{path}' holds {found} values that cannot be stored as {target} without losing data"
        )))
    }
}

/// Iterator returned by [`batches_to_tables`].
#[derive(Debug)]
pub struct RecordTables<G> {
    groups: G,
    builder: TableBuilder,
}

impl<G, V> Iterator for RecordTables<G>
where
    G: Iterator<Item = Vec<V>>,
    V: Into<Value>,
{
    type Item = UploadResult<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let group = self.groups.next()?;
        Some(self.builder.build(group))
    }
}

/// Convert each group of records into a [`RecordBatch`].
///
/// Every record must be a [`Value::Map`]. If `schema` is `None`, the schema is inferred from
/// the first group (union of its keys, in first-seen order) and reused for every later
/// group, so all produced tables share one schema. Values that cannot be stored in the
/// schema without loss (`1.5` or `"7"` in an integer column) fail with [`UploadError::Arrow`].
pub fn batches_to_tables<G, V>(groups: G, schema: Option<SchemaRef>) -> RecordTables<G::IntoIter>
where
    G: IntoIterator<Item = Vec<V>>,
    V: Into<Value>,
{
    RecordTables {
        groups: groups.into_iter(),
        builder: TableBuilder::new(schema),
    }
}
