//! Validation of the designated embedding column.
//!
//! An embedding column must hold one fixed-dimension numeric vector per row, with no nulls
//! anywhere. Dimensionality is resolved from the first table of an upload and threaded
//! through the validation of every following table.

use arrow::array::{Array, AsArray};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, FieldRef};
use arrow::record_batch::RecordBatch;

use crate::error::{UploadError, UploadResult};

/// Validate `column_name` in `table` as an embedding column and return its dimension.
///
/// - Missing column: [`UploadError::Validation`].
/// - Not a list of integers/floats/decimals: [`UploadError::UnsupportedType`].
/// - Dimension differs from `expected_dim`, rows of differing length, or any null vector or
///   null element: [`UploadError::Validation`].
///
/// When `expected_dim` is `None` the dimension is the length of the first row's vector.
/// Pass the returned value as `expected_dim` when validating the next table of the same
/// upload.
pub fn validate_embedding_column(
    table: &RecordBatch,
    column_name: &str,
    expected_dim: Option<usize>,
) -> UploadResult<usize> {
    let column = table.column_by_name(column_name).ok_or_else(|| {
        UploadError::validation(format!("Embedding column '{column_name}' not found in table"))
    })?;

    let item = list_item_field(column.data_type()).ok_or_else(|| {
        UploadError::unsupported_type(format!(
            "Embedding column '{column_name}' must be a list of numbers, got {}",
            column.data_type()
        ))
    })?;
    if !is_numeric(item.data_type()) {
        return Err(UploadError::unsupported_type(format!(
            "Embedding column '{column_name}' must contain numeric values, got {}",
            item.data_type()
        )));
    }

    let null_rows = column.null_count();
    if null_rows == column.len() && null_rows > 0 {
        return Err(null_error(column_name, null_rows));
    }

    let first_dim = first_vector_len(column.as_ref());
    let dim = match (expected_dim, first_dim) {
        (Some(expected), Some(found)) if expected != found => {
            return Err(UploadError::validation(format!(
                "Embedding column '{column_name}' has dimension {found}, expected {expected} \
                 (dimension established by earlier rows)"
            )));
        }
        (Some(expected), _) => expected,
        (None, Some(found)) => found,
        (None, None) => {
            return Err(UploadError::validation(format!(
                "Cannot determine the dimension of embedding column '{column_name}' from an empty table"
            )));
        }
    };

    let size = i32::try_from(dim).map_err(|_| {
        UploadError::validation(format!(
            "Embedding column '{column_name}' dimension {dim} is too large"
        ))
    })?;
    let fixed_type = DataType::FixedSizeList(item.clone(), size);
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    let fixed = cast_with_options(column, &fixed_type, &options).map_err(|e| {
        UploadError::validation(format!(
            "Embedding column '{column_name}' must have {dim} values in every row: {e}"
        ))
    })?;

    if fixed.null_count() > 0 {
        return Err(null_error(column_name, fixed.null_count()));
    }
    let null_values = fixed.as_fixed_size_list().values().null_count();
    if null_values > 0 {
        return Err(null_error(column_name, null_values));
    }

    Ok(dim)
}

fn null_error(column_name: &str, count: usize) -> UploadError {
    UploadError::validation(format!(
        "Embedding column '{column_name}' contains {count} null value(s); embeddings may not be null"
    ))
}

fn list_item_field(data_type: &DataType) -> Option<&FieldRef> {
    match data_type {
        DataType::List(item) | DataType::LargeList(item) | DataType::FixedSizeList(item, _) => Some(item),
        _ => None,
    }
}

fn is_numeric(data_type: &DataType) -> bool {
    data_type.is_integer()
        || data_type.is_floating()
        || matches!(data_type, DataType::Decimal128(..) | DataType::Decimal256(..))
}

/// Length of the first non-null vector, if any.
fn first_vector_len(column: &dyn Array) -> Option<usize> {
    let idx = (0..column.len()).find(|&i| column.is_valid(i))?;
    match column.data_type() {
        DataType::List(_) => usize::try_from(column.as_list::<i32>().value_length(idx)).ok(),
        DataType::LargeList(_) => usize::try_from(column.as_list::<i64>().value_length(idx)).ok(),
        DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Array, ArrayRef, FixedSizeListArray, Float32Array, ListArray, StringArray};
    use arrow::buffer::OffsetBuffer;
    use arrow::datatypes::{DataType, Field, Float64Type, Int32Type, Schema};
    use arrow::record_batch::RecordBatch;

    use super::validate_embedding_column;
    use crate::error::UploadError;

    fn table_with(column: ArrayRef) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("emb", column.data_type().clone(), true)]));
        RecordBatch::try_new(schema, vec![column]).unwrap()
    }

    fn vectors(rows: Vec<Option<Vec<Option<f64>>>>) -> RecordBatch {
        table_with(Arc::new(ListArray::from_iter_primitive::<Float64Type, _, _>(rows)))
    }

    fn is_validation(err: &UploadError) -> bool {
        matches!(err, UploadError::Validation { .. })
    }

    #[test]
    fn consistent_vectors_report_dimension() {
        let t = vectors(vec![
            Some(vec![Some(1.0), Some(0.0), Some(0.0)]),
            Some(vec![Some(0.0), Some(1.0), Some(0.0)]),
        ]);
        assert_eq!(validate_embedding_column(&t, "emb", None).unwrap(), 3);
        assert_eq!(validate_embedding_column(&t, "emb", Some(3)).unwrap(), 3);
    }

    #[test]
    fn fixed_size_list_is_accepted() {
        let values = Float32Array::from(vec![1.0, 2.0, 3.0, 4.0]);
        let fsl = FixedSizeListArray::try_new(
            Arc::new(Field::new_list_field(DataType::Float32, true)),
            2,
            Arc::new(values),
            None,
        )
        .unwrap();
        assert_eq!(validate_embedding_column(&table_with(Arc::new(fsl)), "emb", None).unwrap(), 2);
    }

    #[test]
    fn missing_column_is_validation_error() {
        let t = vectors(vec![Some(vec![Some(1.0)])]);
        let err = validate_embedding_column(&t, "nope", None).unwrap_err();
        assert!(is_validation(&err));
        assert!(err.to_string().contains("'nope' not found"));
    }

    #[test]
    fn wrong_types_are_type_errors() {
        let strings = table_with(Arc::new(StringArray::from(vec!["a", "b"])));
        let err = validate_embedding_column(&strings, "emb", None).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));

        let string_items = ListArray::try_new(
            Arc::new(Field::new_list_field(DataType::Utf8, true)),
            OffsetBuffer::from_lengths([2]),
            Arc::new(StringArray::from(vec!["a", "b"])),
            None,
        )
        .unwrap();
        let err = validate_embedding_column(&table_with(Arc::new(string_items)), "emb", None).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
    }

    #[test]
    fn dimension_mismatch_with_expected_reports_both() {
        let t = vectors(vec![Some(vec![Some(1.0), Some(2.0)])]);
        let err = validate_embedding_column(&t, "emb", Some(4)).unwrap_err();
        assert!(is_validation(&err));
        let msg = err.to_string();
        assert!(msg.contains("dimension 2"), "{msg}");
        assert!(msg.contains("expected 4"), "{msg}");
    }

    #[test]
    fn ragged_row_is_rejected() {
        let t = vectors(vec![
            Some(vec![Some(1.0), Some(0.0), Some(0.0), Some(0.0)]),
            Some(vec![Some(0.0), Some(0.0), Some(1.0)]),
            Some(vec![Some(0.0), Some(0.0), Some(0.0), Some(1.0)]),
        ]);
        let err = validate_embedding_column(&t, "emb", None).unwrap_err();
        assert!(is_validation(&err));
    }

    #[test]
    fn null_vector_is_rejected() {
        let t = vectors(vec![Some(vec![Some(1.0), Some(2.0)]), None]);
        let err = validate_embedding_column(&t, "emb", None).unwrap_err();
        assert!(is_validation(&err));
        assert!(err.to_string().contains("1 null"));
    }

    #[test]
    fn null_element_is_rejected() {
        let t = vectors(vec![Some(vec![Some(1.0), None])]);
        let err = validate_embedding_column(&t, "emb", None).unwrap_err();
        assert!(err.to_string().contains("null"));
    }

    #[test]
    fn all_null_column_is_rejected() {
        let t = vectors(vec![None, None]);
        let err = validate_embedding_column(&t, "emb", None).unwrap_err();
        assert!(err.to_string().contains("2 null"));
    }

    #[test]
    fn integer_vectors_are_numeric() {
        let ints = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
            Some(vec![Some(1), Some(2)]),
            Some(vec![Some(3), Some(4)]),
        ]);
        assert_eq!(validate_embedding_column(&table_with(Arc::new(ints)), "emb", None).unwrap(), 2);
    }
}
