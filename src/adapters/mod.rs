//! Source-specific entry points feeding the upload pipeline.
//!
//! - [`dicts`]: streams of JSON-like records, batched into tables.
//! - [`dataframe`]: whole dataframes (Arrow tables, or Polars frames with the `polars` feature).
//! - [`nodes`]: document/chunk nodes, serialized to records and optionally flattened.

pub mod dataframe;
pub mod dicts;
pub mod nodes;

pub use dataframe::{upload_from_dataframes, DataFrameBackend, ToColumnarTable};
#[cfg(feature = "polars")]
pub use dataframe::{upload_from_polars, PolarsFrames};
pub use dicts::upload_from_dicts;
pub use nodes::{upload_from_nodes, NodeOptions};
