//! Parquet serialization of Arrow tables.
//!
//! Each uploaded batch is written as one self-contained Parquet file held in memory.

use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::UploadResult;

/// Writer configuration for uploaded Parquet files.
#[derive(Debug, Clone)]
struct ParquetConfig {
    max_row_group_size: usize,
    compression: Compression,
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            max_row_group_size: 100_000,
            compression: Compression::SNAPPY,
        }
    }
}

fn writer_properties(config: &ParquetConfig) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(config.compression)
        .set_max_row_group_size(config.max_row_group_size)
        .build()
}

/// Serialize `table` into an in-memory, Snappy-compressed Parquet file.
pub fn write_parquet(table: &RecordBatch) -> UploadResult<Vec<u8>> {
    let props = writer_properties(&ParquetConfig::default());
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, table.schema(), Some(props))?;
    writer.write(table)?;
    writer.close()?;
    Ok(buf)
}

/// Read every record batch back out of an in-memory Parquet file.
pub fn read_parquet(data: impl Into<Bytes>) -> UploadResult<Vec<RecordBatch>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(data.into())?.build()?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

/// Read an in-memory Parquet file back as a single table.
pub fn read_parquet_table(data: impl Into<Bytes>) -> UploadResult<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data.into())?;
    let schema = Arc::clone(builder.schema());
    let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}
