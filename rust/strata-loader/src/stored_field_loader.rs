//! Per-document loading of stored fields and source, shared by the row-stride
//! readers of one segment run.

use std::fmt;

use strata_common::{Result, error::Error};
use strata_segment::{
    segment::SegmentReader,
    source::{Source, SourceLoader, StoredSourceLoader},
    stored::{StoredDocument, StoredFieldsReader, StoredFieldsSpec, StoredValue},
};

/// Loads the stored fields (and, when required, the decoded source) of the
/// current document once, for all row-stride readers of a segment run.
pub struct StoredFieldLoader {
    spec: StoredFieldsSpec,
    sequential: bool,
    reader: Option<Box<dyn StoredFieldsReader>>,
    source_loader: Option<Box<dyn SourceLoader>>,
    current_doc: Option<u32>,
    document: StoredDocument,
    source: Option<Source>,
}

impl StoredFieldLoader {
    /// A loader with no requirements: it never touches the segment.
    pub fn empty() -> StoredFieldLoader {
        StoredFieldLoader {
            spec: StoredFieldsSpec::NO_REQUIREMENTS,
            sequential: false,
            reader: None,
            source_loader: None,
            current_doc: None,
            document: StoredDocument::default(),
            source: None,
        }
    }

    /// Creates a loader for `spec` over `segment`.
    ///
    /// When `spec.requires_source` is set, `source_loader` rebuilds it from the
    /// stored fields it declares; a stored `_source` loader is used if none is
    /// given. `sequential` marks loads of a contiguous doc range.
    pub fn new(
        segment: &dyn SegmentReader,
        spec: StoredFieldsSpec,
        source_loader: Option<Box<dyn SourceLoader>>,
        sequential: bool,
    ) -> Result<StoredFieldLoader> {
        if spec.is_empty() {
            return Ok(Self::empty());
        }
        let (spec, source_loader) = if spec.requires_source {
            let source_loader =
                source_loader.unwrap_or_else(|| Box::new(StoredSourceLoader) as Box<dyn SourceLoader>);
            (
                spec.merge(&source_loader.required_stored_fields()),
                Some(source_loader),
            )
        } else {
            (spec, None)
        };
        Ok(StoredFieldLoader {
            spec,
            sequential,
            reader: Some(segment.stored_fields()?),
            source_loader,
            current_doc: None,
            document: StoredDocument::default(),
            source: None,
        })
    }

    pub fn is_sequential(&self) -> bool {
        self.sequential
    }

    /// Loads `doc`. Loading the current document again is a no-op.
    pub fn advance_to(&mut self, doc: u32) -> Result<()> {
        if self.current_doc == Some(doc) {
            return Ok(());
        }
        self.current_doc = None;
        if let Some(reader) = self.reader.as_mut() {
            self.document = reader.document(doc, &self.spec)?;
            self.source = match self.source_loader.as_mut() {
                Some(loader) => Some(loader.source(&self.document, doc)?),
                None => None,
            };
        }
        self.current_doc = Some(doc);
        Ok(())
    }

    /// The stored values of `field` for the current document.
    pub fn values(&self, field: &str) -> &[StoredValue] {
        self.document.values(field)
    }

    /// The source of the current document.
    pub fn source(&self) -> Result<&Source> {
        self.source
            .as_ref()
            .ok_or_else(|| Error::invalid_operation("source was not requested"))
    }
}

impl fmt::Display for StoredFieldLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stored_fields[requires_source:{}, fields:{}, sequential: {}]",
            self.spec.requires_source,
            self.spec.fields.len(),
            self.sequential
        )
    }
}

impl fmt::Debug for StoredFieldLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_segment::memory::{MemorySegment, SegmentBuilder};

    fn segment() -> MemorySegment {
        let mut builder = SegmentBuilder::new(0);
        for i in 0..3 {
            builder.start_document();
            builder.add_stored_value("kwd", StoredValue::Bytes(format!("k{i}").into_bytes()));
            builder.set_source(&json!({ "long": i })).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_empty_loader_does_not_read() {
        let segment = segment();
        let mut loader =
            StoredFieldLoader::new(&segment, StoredFieldsSpec::NO_REQUIREMENTS, None, false)
                .unwrap();
        assert!(!loader.is_sequential());
        loader.advance_to(1).unwrap();
        assert!(loader.values("kwd").is_empty());
        assert!(loader.source().is_err());
        assert_eq!(segment.documents_loaded(), 0);
    }

    #[test]
    fn test_loads_each_document_once() {
        let segment = segment();
        let spec = StoredFieldsSpec::fields(["kwd"]).merge(&StoredFieldsSpec::NEEDS_SOURCE);
        let mut loader = StoredFieldLoader::new(&segment, spec, None, true).unwrap();
        loader.advance_to(2).unwrap();
        loader.advance_to(2).unwrap();
        assert_eq!(loader.values("kwd"), &[StoredValue::Bytes(b"k2".to_vec())]);
        assert_eq!(
            loader.source().unwrap().extract_values("long"),
            vec![&json!(2)]
        );
        assert_eq!(segment.documents_loaded(), 1);
        loader.advance_to(0).unwrap();
        assert_eq!(segment.documents_loaded(), 2);
    }

    #[test]
    fn test_description() {
        let segment = segment();
        let spec = StoredFieldsSpec::fields(["kwd"]);
        let loader = StoredFieldLoader::new(&segment, spec, None, false).unwrap();
        assert_eq!(
            loader.to_string(),
            "stored_fields[requires_source:false, fields:1, sequential: false]"
        );
        let loader =
            StoredFieldLoader::new(&segment, StoredFieldsSpec::NEEDS_SOURCE, None, true).unwrap();
        assert_eq!(
            loader.to_string(),
            "stored_fields[requires_source:true, fields:0, sequential: true]"
        );
    }
}
