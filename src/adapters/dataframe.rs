//! Dataframe entry points.
//!
//! Anything that can turn itself into one Arrow table implements [`ToColumnarTable`]; each
//! frame is uploaded whole, never split. Dataframe libraries are optional: their support is
//! compiled in through Cargo features and checked with [`DataFrameBackend::ensure_available`].

use arrow::record_batch::RecordBatch;

use crate::error::{UploadError, UploadResult};
use crate::transport::DatasetTransport;
use crate::types::DatasetMetadata;
use crate::upload::{upload_tables, UploadOptions};

/// Conversion of a dataframe-like value into a single Arrow table.
pub trait ToColumnarTable {
    fn to_columnar_table(&self) -> UploadResult<RecordBatch>;
}

impl ToColumnarTable for RecordBatch {
    fn to_columnar_table(&self) -> UploadResult<RecordBatch> {
        Ok(self.clone())
    }
}

impl<T: ToColumnarTable + ?Sized> ToColumnarTable for &T {
    fn to_columnar_table(&self) -> UploadResult<RecordBatch> {
        (**self).to_columnar_table()
    }
}

#[cfg(feature = "polars")]
impl ToColumnarTable for polars::prelude::DataFrame {
    /// Hands the frame over as an in-memory Parquet file.
    fn to_columnar_table(&self) -> UploadResult<RecordBatch> {
        use polars::prelude::ParquetWriter;

        let mut buf = Vec::new();
        ParquetWriter::new(&mut buf).finish(&mut self.clone())?;
        crate::codec::read_parquet_table(buf)
    }
}

/// Optional dataframe libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFrameBackend {
    Polars,
}

impl DataFrameBackend {
    /// Cargo feature that enables this backend.
    pub fn feature(self) -> &'static str {
        match self {
            DataFrameBackend::Polars => "polars",
        }
    }

    pub fn is_available(self) -> bool {
        match self {
            DataFrameBackend::Polars => cfg!(feature = "polars"),
        }
    }

    /// Fails with [`UploadError::FeatureNotAvailable`] if the backend is not compiled in.
    pub fn ensure_available(self) -> UploadResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(UploadError::FeatureNotAvailable {
                feature: self.feature(),
            })
        }
    }
}

/// Upload a stream of dataframes as one dataset, one table per frame.
///
/// Frames are converted lazily, one at a time, as the upload consumes them.
pub fn upload_from_dataframes<T, I>(transport: &T, frames: I, options: &UploadOptions) -> UploadResult<DatasetMetadata>
where
    T: DatasetTransport + ?Sized,
    I: IntoIterator,
    I::Item: ToColumnarTable,
{
    let tables = frames.into_iter().map(|frame| frame.to_columnar_table());
    upload_tables(transport, tables, options)
}

/// One Polars frame or a stream of them.
#[cfg(feature = "polars")]
#[derive(Debug)]
pub enum PolarsFrames<I> {
    One(polars::prelude::DataFrame),
    Many(I),
}

#[cfg(feature = "polars")]
impl PolarsFrames<std::iter::Empty<polars::prelude::DataFrame>> {
    pub fn one(frame: polars::prelude::DataFrame) -> Self {
        PolarsFrames::One(frame)
    }
}

#[cfg(feature = "polars")]
impl<I: Iterator<Item = polars::prelude::DataFrame>> PolarsFrames<I> {
    pub fn many<F>(frames: F) -> Self
    where
        F: IntoIterator<IntoIter = I, Item = polars::prelude::DataFrame>,
    {
        PolarsFrames::Many(frames.into_iter())
    }
}

/// Upload one Polars frame, or many, as one dataset.
///
/// ```
/// use airtrain::adapters::{upload_from_polars, PolarsFrames};
/// use airtrain::transport::InMemoryTransport;
/// use airtrain::upload::UploadOptions;
/// use polars::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let frame = df!("foo" => [1i64, 2, 3])?;
/// let transport = InMemoryTransport::new();
/// let dataset = upload_from_polars(&transport, PolarsFrames::one(frame), &UploadOptions::default())?;
/// assert_eq!(dataset.size(), 3);
///
/// let frames = (0..3i64).map(|i| df!("foo" => [i]).unwrap());
/// let dataset = upload_from_polars(&transport, PolarsFrames::many(frames), &UploadOptions::default())?;
/// assert_eq!(dataset.size(), 3);
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "polars")]
pub fn upload_from_polars<T, I>(
    transport: &T,
    frames: PolarsFrames<I>,
    options: &UploadOptions,
) -> UploadResult<DatasetMetadata>
where
    T: DatasetTransport + ?Sized,
    I: Iterator<Item = polars::prelude::DataFrame>,
{
    match frames {
        PolarsFrames::One(frame) => upload_from_dataframes(transport, std::iter::once(frame), options),
        PolarsFrames::Many(frames) => upload_from_dataframes(transport, frames, options),
    }
}
