//! Document/chunk node entry point.
//!
//! Nodes are any `serde::Serialize` type that serializes to a map (the usual shape of a
//! text-chunk node: id, text, optional `embedding`, `metadata`, `relationships`). Each node
//! becomes one record. The `relationships` and `metadata` maps can be flattened into one
//! string column per leaf, named by the dot-joined key path:
//!
//! ```text
//! {"relationships": {"NEXT": {"node_id": "X"}}}  ->  "relationships.NEXT.node_id" = "X"
//! ```
//!
//! Null leaves are dropped and lists are kept whole, as their JSON text.

use std::collections::VecDeque;
use std::iter;

use serde::Serialize;

use crate::batch::{to_batches, TableBuilder};
use crate::error::{UploadError, UploadResult};
use crate::transport::DatasetTransport;
use crate::types::{DatasetMetadata, Value};
use crate::upload::{reject, upload_tables, UploadOptions};

const EMBEDDING_KEY: &str = "embedding";
const RELATIONSHIPS_KEY: &str = "relationships";
const METADATA_KEY: &str = "metadata";

/// Which node fields are flattened into per-leaf columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOptions {
    pub flatten_relationships: bool,
    pub flatten_metadata: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            flatten_relationships: true,
            flatten_metadata: true,
        }
    }
}

/// Upload a stream of document nodes as one dataset.
///
/// The first node decides whether embeddings are present: if its `embedding` field is set
/// and `options.embedding_column` is not, the dataset is created with `"embedding"` as the
/// embedding column. A null `embedding` field is dropped from every record.
///
/// # Errors
///
/// Fails with [`UploadError::Validation`] on an empty stream or a node that cannot be
/// serialized, and otherwise as [`crate::adapters::upload_from_dicts`] does.
pub fn upload_from_nodes<T, I>(
    transport: &T,
    nodes: I,
    options: &UploadOptions,
    node_options: NodeOptions,
) -> UploadResult<DatasetMetadata>
where
    T: DatasetTransport + ?Sized,
    I: IntoIterator,
    I::Item: Serialize,
{
    let mut nodes = nodes.into_iter();
    let Some(first) = nodes.next() else {
        return Err(reject(options, UploadError::validation("No nodes to upload.")));
    };
    let first = node_to_record(&first, node_options).map_err(|e| reject(options, e))?;

    let mut options = options.clone();
    let has_embedding = first.get(EMBEDDING_KEY).is_some_and(|v| !v.is_null());
    if has_embedding && options.embedding_column.is_none() {
        options.embedding_column = Some(EMBEDDING_KEY.to_string());
    }

    let records = iter::once(Ok(first)).chain(nodes.map(move |node| node_to_record(&node, node_options)));
    let groups = to_batches(records, options.max_batch_size).map_err(|e| reject(&options, e))?;
    let mut builder = TableBuilder::new(options.schema.clone());
    let tables = groups.map(move |group| {
        let group = group.into_iter().collect::<UploadResult<Vec<Value>>>()?;
        builder.build(group)
    });
    upload_tables(transport, tables, &options)
}

fn node_to_record<N: Serialize>(node: &N, node_options: NodeOptions) -> UploadResult<Value> {
    let json = serde_json::to_value(node)
        .map_err(|e| UploadError::validation(format!("Node could not be serialized: {e}")))?;
    let mut record = Value::from(json);

    if record.get(EMBEDDING_KEY).is_some_and(Value::is_null) {
        record.remove(EMBEDDING_KEY);
    }

    let flattened_keys = [
        (RELATIONSHIPS_KEY, node_options.flatten_relationships),
        (METADATA_KEY, node_options.flatten_metadata),
    ];
    for (key, enabled) in flattened_keys {
        if enabled {
            flatten_in_place(&mut record, key);
        }
    }
    Ok(record)
}

/// Replace the map under `key` with its flattened leaves, at the same position.
fn flatten_in_place(record: &mut Value, key: &str) {
    let Value::Map(entries) = record else {
        return;
    };
    let Some(idx) = entries.iter().position(|(k, v)| k == key && matches!(v, Value::Map(_))) else {
        return;
    };
    let (prefix, nested) = entries.remove(idx);
    let leaves = flatten_map(&prefix, nested);
    entries.splice(idx..idx, leaves);
}

/// Walk `value` breadth-first, yielding `(dotted.path, text)` for every non-null leaf.
pub(crate) fn flatten_map(prefix: &str, value: Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([(prefix.to_string(), value)]);
    while let Some((path, value)) = queue.pop_front() {
        match value {
            Value::Map(entries) => {
                for (k, v) in entries {
                    queue.push_back((format!("{path}.{k}"), v));
                }
            }
            Value::Null => {}
            Value::Str(s) => out.push((path, Value::Str(s))),
            leaf => out.push((path, Value::Str(serde_json::Value::from(&leaf).to_string()))),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::json;

    use super::{flatten_map, node_to_record, NodeOptions};
    use crate::types::Value;

    #[test]
    fn flattening_is_breadth_first_and_drops_nulls() {
        let nested = Value::from(json!({
            "b": {"deep": 1},
            "a": "x",
            "gone": null,
            "tags": ["p", "q"],
        }));
        let flat = flatten_map("metadata", nested);
        let keys: Vec<&str> = flat.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["metadata.a", "metadata.tags", "metadata.b.deep"]);
        assert_eq!(flat[0].1, Value::from("x"));
        assert_eq!(flat[1].1, Value::from(r#"["p","q"]"#));
        assert_eq!(flat[2].1, Value::from("1"));
    }

    #[derive(Serialize)]
    struct Node {
        id_: String,
        text: String,
        embedding: Option<Vec<f32>>,
        metadata: serde_json::Value,
        relationships: serde_json::Value,
    }

    #[test]
    fn record_keeps_field_order_and_drops_null_embedding() {
        let node = Node {
            id_: "n1".to_string(),
            text: "hello".to_string(),
            embedding: None,
            metadata: json!({"file": "a.txt"}),
            relationships: json!({"NEXT": {"node_id": "n2"}}),
        };
        let record = node_to_record(&node, NodeOptions::default()).unwrap();
        let Value::Map(entries) = record else {
            panic!("expected a map");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["id_", "text", "metadata.file", "relationships.NEXT.node_id"]);
    }

    #[test]
    fn flattening_can_be_disabled() {
        let node = Node {
            id_: "n1".to_string(),
            text: "hello".to_string(),
            embedding: Some(vec![1.0]),
            metadata: json!({"file": "a.txt"}),
            relationships: json!({}),
        };
        let opts = NodeOptions {
            flatten_metadata: false,
            ..Default::default()
        };
        let record = node_to_record(&node, opts).unwrap();
        assert!(record.get("embedding").is_some());
        assert_eq!(record.get("metadata"), Some(&Value::from(json!({"file": "a.txt"}))));
        assert!(record.get("relationships").is_none());
    }
}
