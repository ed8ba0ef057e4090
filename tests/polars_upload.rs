#![cfg(feature = "polars")]

use airtrain::adapters::{upload_from_polars, DataFrameBackend, PolarsFrames};
use airtrain::arrow::array::AsArray;
use airtrain::arrow::datatypes::Int64Type;
use airtrain::transport::InMemoryTransport;
use airtrain::upload::UploadOptions;
use airtrain::UploadError;
use polars::prelude::*;

fn frame(foo: &[i64], bar: &[&str]) -> DataFrame {
    df!("foo" => foo, "bar" => bar).unwrap()
}

#[test]
fn upload_from_single_frame() {
    let t = InMemoryTransport::new();
    let opts = UploadOptions {
        name: Some("Foo dataset".to_string()),
        ..Default::default()
    };
    let df = frame(&[42, 43, 44, 45], &["a", "b", "c", "d"]);
    let ds = upload_from_polars(&t, PolarsFrames::one(df), &opts).unwrap();
    assert_eq!(ds.size(), 4);
    assert_eq!(ds.name(), "Foo dataset");

    let table = t.dataset(ds.id()).unwrap().ingested.unwrap();
    let foo = table.column_by_name("foo").unwrap();
    assert_eq!(foo.as_primitive::<Int64Type>().values(), &[42, 43, 44, 45]);
}

#[test]
fn upload_from_multiple_frames() {
    let t = InMemoryTransport::new();
    let frames = vec![
        frame(&[42, 43, 44, 45], &["a", "b", "c", "d"]),
        frame(&[46, 47, 48, 49], &["e", "f", "g", "h"]),
    ];
    let ds = upload_from_polars(&t, PolarsFrames::many(frames), &UploadOptions::default()).unwrap();
    assert_eq!(ds.size(), 8);

    let fake = t.dataset(ds.id()).unwrap();
    assert_eq!(fake.source_data.len(), 2);
    let table = fake.ingested.unwrap();
    let foo = table.column_by_name("foo").unwrap();
    assert_eq!(foo.as_primitive::<Int64Type>().values(), &[42, 43, 44, 45, 46, 47, 48, 49]);
}

#[test]
fn mismatched_frames_are_rejected() {
    let t = InMemoryTransport::new();
    let frames = vec![
        frame(&[1], &["a"]),
        df!("foo" => [1.5f64], "bar" => ["b"]).unwrap(),
    ];
    let err = upload_from_polars(&t, PolarsFrames::many(frames), &UploadOptions::default()).unwrap_err();
    assert!(matches!(err, UploadError::Validation { .. }));
}

#[test]
fn polars_backend_is_available() {
    assert!(DataFrameBackend::Polars.is_available());
    DataFrameBackend::Polars.ensure_available().unwrap();
}
