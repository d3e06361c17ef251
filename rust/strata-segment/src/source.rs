//! The original document body and its loaders.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use strata_common::{Result, error::Error};

use crate::stored::{StoredDocument, StoredFieldsSpec};

/// A decoded document source: a JSON object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    root: serde_json::Map<String, JsonValue>,
}

impl Source {
    pub fn empty() -> Source {
        Source::default()
    }

    /// Parses a JSON object. Anything else is a decode fault.
    pub fn from_bytes(bytes: &[u8]) -> Result<Source> {
        match serde_json::from_slice::<JsonValue>(bytes) {
            Ok(JsonValue::Object(root)) => Ok(Source { root }),
            Ok(_) => Err(Error::invalid_format_msg(
                "_source",
                "document source is not an object",
            )),
            Err(e) => Err(Error::invalid_format_msg("_source", e.to_string())),
        }
    }

    pub fn from_json(value: JsonValue) -> Result<Source> {
        match value {
            JsonValue::Object(root) => Ok(Source { root }),
            _ => Err(Error::invalid_format_msg(
                "_source",
                "document source is not an object",
            )),
        }
    }

    pub fn as_map(&self) -> &serde_json::Map<String, JsonValue> {
        &self.root
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.root)
            .map_err(|e| Error::invalid_format_msg("_source", e.to_string()))
    }

    /// Returns the raw values found at the dotted `path`, in document order.
    ///
    /// Arrays met along the way or at the leaf are flattened, so a field holding
    /// `[1, [2, 3]]` yields three values. Paths that do not resolve yield
    /// nothing. `null` leaves are returned as-is and left to the caller.
    pub fn extract_values(&self, path: &str) -> Vec<&JsonValue> {
        let mut out = Vec::new();
        if let Some(value) = self.root.get(path) {
            flatten_into(value, &mut out);
            return out;
        }
        let mut parts = path.splitn(2, '.');
        let (Some(head), Some(rest)) = (parts.next(), parts.next()) else {
            return out;
        };
        if let Some(value) = self.root.get(head) {
            extract_nested(value, rest, &mut out);
        }
        out
    }
}

fn flatten_into<'a>(value: &'a JsonValue, out: &mut Vec<&'a JsonValue>) {
    match value {
        JsonValue::Array(items) => items.iter().for_each(|item| flatten_into(item, out)),
        other => out.push(other),
    }
}

fn extract_nested<'a>(value: &'a JsonValue, path: &str, out: &mut Vec<&'a JsonValue>) {
    match value {
        JsonValue::Array(items) => items
            .iter()
            .for_each(|item| extract_nested(item, path, out)),
        JsonValue::Object(map) => {
            if let Some(value) = map.get(path) {
                flatten_into(value, out);
                return;
            }
            if let Some((head, rest)) = path.split_once('.') {
                if let Some(value) = map.get(head) {
                    extract_nested(value, rest, out);
                }
            }
        }
        _ => {}
    }
}

/// Produces the [`Source`] of a document from its stored fields.
pub trait SourceLoader: Send {
    /// The stored fields the loader needs to rebuild the source.
    fn required_stored_fields(&self) -> StoredFieldsSpec;

    fn source(&mut self, stored: &StoredDocument, doc: u32) -> Result<Source>;
}

/// Creates a fresh [`SourceLoader`] for each segment run.
pub type SourceLoaderSupplier = Arc<dyn Fn() -> Box<dyn SourceLoader> + Send + Sync>;

/// Loads the source kept verbatim in the `_source` stored field.
///
/// A document without a stored source has an empty source.
#[derive(Debug, Default)]
pub struct StoredSourceLoader;

impl StoredSourceLoader {
    pub fn supplier() -> SourceLoaderSupplier {
        Arc::new(|| Box::new(StoredSourceLoader))
    }
}

impl SourceLoader for StoredSourceLoader {
    fn required_stored_fields(&self) -> StoredFieldsSpec {
        StoredFieldsSpec::NEEDS_SOURCE
    }

    fn source(&mut self, stored: &StoredDocument, doc: u32) -> Result<Source> {
        match &stored.source {
            Some(bytes) => Source::from_bytes(bytes).map_err(|e| {
                log::warn!("malformed source in doc {doc}: {e}");
                e
            }),
            None => Ok(Source::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_common::error::ErrorKind;

    fn source(value: JsonValue) -> Source {
        Source::from_json(value).unwrap()
    }

    #[test]
    fn test_extract_keeps_document_order() {
        let s = source(json!({ "mv": [3, 1, 2, 1], "one": "a" }));
        assert_eq!(
            s.extract_values("mv"),
            vec![&json!(3), &json!(1), &json!(2), &json!(1)]
        );
        assert_eq!(s.extract_values("one"), vec![&json!("a")]);
        assert!(s.extract_values("missing").is_empty());
    }

    #[test]
    fn test_extract_nested_paths() {
        let s = source(json!({
            "obj": { "inner": [1, 2] },
            "list": [{ "x": "a" }, { "x": ["b", "c"] }, { "y": 1 }],
            "dotted.name": 5
        }));
        assert_eq!(s.extract_values("obj.inner"), vec![&json!(1), &json!(2)]);
        assert_eq!(
            s.extract_values("list.x"),
            vec![&json!("a"), &json!("b"), &json!("c")]
        );
        assert_eq!(s.extract_values("dotted.name"), vec![&json!(5)]);
        assert!(s.extract_values("obj.missing").is_empty());
    }

    #[test]
    fn test_from_bytes_faults() {
        let err = Source::from_bytes(b"[1, 2]").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
        assert!(Source::from_bytes(b"{\"a\":").is_err());
    }

    #[test]
    fn test_stored_source_loader() {
        let mut loader = StoredSourceLoader;
        assert!(loader.required_stored_fields().requires_source);
        let stored = StoredDocument {
            source: Some(br#"{"a":[1,2]}"#.to_vec()),
            ..Default::default()
        };
        let s = loader.source(&stored, 0).unwrap();
        assert_eq!(s.extract_values("a").len(), 2);
        let s = loader.source(&StoredDocument::default(), 1).unwrap();
        assert_eq!(s, Source::empty());
    }
}
