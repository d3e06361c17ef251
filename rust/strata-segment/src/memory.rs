//! An in-memory segment.

use std::{
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ahash::AHashMap;
use serde_json::Value as JsonValue;
use strata_common::{Result, error::Error, verify_arg};

use crate::{
    doc_values::{
        NumericColumn, NumericDocValues, OrdinalsColumn, SortedDocValues, SortedNumericDocValues,
        SortedSetDocValues, double_to_sortable_long,
    },
    segment::SegmentReader,
    stored::{
        SOURCE_FIELD, StoredDocument, StoredFieldsReader, StoredFieldsSpec, StoredValue,
        decode_record, encode_record,
    },
};

/// A segment held entirely in memory, built with [`SegmentBuilder`].
///
/// Numeric doc values keep every value of a document, sorted ascending with
/// duplicates. Keyword doc values are dictionary encoded: each document holds
/// unique ordinals into a sorted dictionary. A column is exposed in its
/// single-valued form when no document holds more than one value.
pub struct MemorySegment {
    ordinal: u32,
    max_doc: u32,
    numeric: AHashMap<String, Arc<NumericData>>,
    ordinals: AHashMap<String, Arc<OrdinalData>>,
    stored: Arc<Vec<Vec<u8>>>,
    documents_loaded: Arc<AtomicU64>,
}

impl MemorySegment {
    /// The number of stored documents loaded so far through any reader of
    /// this segment.
    pub fn documents_loaded(&self) -> u64 {
        self.documents_loaded.load(Ordering::Relaxed)
    }

    pub fn has_numeric_field(&self, field: &str) -> bool {
        self.numeric.contains_key(field)
    }

    pub fn has_ordinals_field(&self, field: &str) -> bool {
        self.ordinals.contains_key(field)
    }
}

impl SegmentReader for MemorySegment {
    fn ordinal(&self) -> u32 {
        self.ordinal
    }

    fn max_doc(&self) -> u32 {
        self.max_doc
    }

    fn numeric_doc_values(&self, field: &str) -> Result<Option<NumericColumn>> {
        let Some(data) = self.numeric.get(field) else {
            return Ok(None);
        };
        let cursor = Box::new(NumericCursor {
            data: data.clone(),
            max_doc: self.max_doc,
            doc: None,
            range: 0..0,
        });
        Ok(Some(if data.singleton {
            NumericColumn::Singleton(cursor)
        } else {
            NumericColumn::Multi(cursor)
        }))
    }

    fn ordinal_doc_values(&self, field: &str) -> Result<Option<OrdinalsColumn>> {
        let Some(data) = self.ordinals.get(field) else {
            return Ok(None);
        };
        let cursor = Box::new(OrdinalsCursor {
            data: data.clone(),
            max_doc: self.max_doc,
            doc: None,
            range: 0..0,
        });
        Ok(Some(if data.singleton {
            OrdinalsColumn::Singleton(cursor)
        } else {
            OrdinalsColumn::Multi(cursor)
        }))
    }

    fn stored_fields(&self) -> Result<Box<dyn StoredFieldsReader>> {
        Ok(Box::new(MemoryStoredFields {
            records: self.stored.clone(),
            documents_loaded: self.documents_loaded.clone(),
        }))
    }
}

impl std::fmt::Debug for MemorySegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySegment")
            .field("ordinal", &self.ordinal)
            .field("max_doc", &self.max_doc)
            .finish_non_exhaustive()
    }
}

struct NumericData {
    /// `max_doc + 1` offsets into `values`.
    offsets: Vec<u32>,
    values: Vec<i64>,
    singleton: bool,
}

struct OrdinalData {
    dictionary: Vec<Vec<u8>>,
    offsets: Vec<u32>,
    ords: Vec<u32>,
    singleton: bool,
}

fn doc_range(offsets: &[u32], doc: u32) -> Range<usize> {
    offsets[doc as usize] as usize..offsets[doc as usize + 1] as usize
}

/// Moves a forward-only cursor to `target`.
fn advance(current: &mut Option<u32>, target: u32, max_doc: u32) -> Result<()> {
    if let Some(doc) = *current {
        if target < doc {
            return Err(Error::invalid_operation(format!(
                "doc values cursor on doc {doc} cannot move back to doc {target}"
            )));
        }
    }
    if target >= max_doc {
        return Err(Error::invalid_format_msg(
            "doc",
            format!("doc {target} out of range [0..{max_doc})"),
        ));
    }
    *current = Some(target);
    Ok(())
}

struct NumericCursor {
    data: Arc<NumericData>,
    max_doc: u32,
    doc: Option<u32>,
    range: Range<usize>,
}

impl NumericCursor {
    fn position(&mut self, doc: u32) -> Result<bool> {
        advance(&mut self.doc, doc, self.max_doc)?;
        self.range = doc_range(&self.data.offsets, doc);
        Ok(!self.range.is_empty())
    }
}

impl NumericDocValues for NumericCursor {
    fn advance_exact(&mut self, doc: u32) -> Result<bool> {
        self.position(doc)
    }

    fn long_value(&self) -> i64 {
        self.data.values[self.range.start]
    }

    fn doc_id(&self) -> Option<u32> {
        self.doc
    }
}

impl SortedNumericDocValues for NumericCursor {
    fn advance_exact(&mut self, doc: u32) -> Result<bool> {
        self.position(doc)
    }

    fn doc_value_count(&self) -> usize {
        self.range.len()
    }

    fn next_value(&mut self) -> i64 {
        let value = self.data.values[self.range.start];
        self.range.start += 1;
        value
    }

    fn doc_id(&self) -> Option<u32> {
        self.doc
    }
}

struct OrdinalsCursor {
    data: Arc<OrdinalData>,
    max_doc: u32,
    doc: Option<u32>,
    range: Range<usize>,
}

impl OrdinalsCursor {
    fn position(&mut self, doc: u32) -> Result<bool> {
        advance(&mut self.doc, doc, self.max_doc)?;
        self.range = doc_range(&self.data.offsets, doc);
        Ok(!self.range.is_empty())
    }

    fn lookup(&self, ord: u32) -> Result<&[u8]> {
        self.data
            .dictionary
            .get(ord as usize)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                Error::invalid_format_msg(
                    "ordinal",
                    format!(
                        "ordinal {ord} out of range [0..{})",
                        self.data.dictionary.len()
                    ),
                )
            })
    }
}

impl SortedDocValues for OrdinalsCursor {
    fn advance_exact(&mut self, doc: u32) -> Result<bool> {
        self.position(doc)
    }

    fn ord(&self) -> u32 {
        self.data.ords[self.range.start]
    }

    fn lookup_ord(&self, ord: u32) -> Result<&[u8]> {
        self.lookup(ord)
    }

    fn value_count(&self) -> usize {
        self.data.dictionary.len()
    }

    fn doc_id(&self) -> Option<u32> {
        self.doc
    }
}

impl SortedSetDocValues for OrdinalsCursor {
    fn advance_exact(&mut self, doc: u32) -> Result<bool> {
        self.position(doc)
    }

    fn doc_value_count(&self) -> usize {
        self.range.len()
    }

    fn next_ord(&mut self) -> u32 {
        let ord = self.data.ords[self.range.start];
        self.range.start += 1;
        ord
    }

    fn lookup_ord(&self, ord: u32) -> Result<&[u8]> {
        self.lookup(ord)
    }

    fn value_count(&self) -> usize {
        self.data.dictionary.len()
    }

    fn doc_id(&self) -> Option<u32> {
        self.doc
    }
}

struct MemoryStoredFields {
    records: Arc<Vec<Vec<u8>>>,
    documents_loaded: Arc<AtomicU64>,
}

impl StoredFieldsReader for MemoryStoredFields {
    fn document(&mut self, doc: u32, spec: &StoredFieldsSpec) -> Result<StoredDocument> {
        let record = self.records.get(doc as usize).ok_or_else(|| {
            Error::invalid_format_msg(
                "doc",
                format!("doc {doc} out of range [0..{})", self.records.len()),
            )
        })?;
        self.documents_loaded.fetch_add(1, Ordering::Relaxed);
        decode_record(record, spec)
    }
}

/// Accumulates documents and builds a [`MemorySegment`].
///
/// Values are always added to the most recently started document.
#[derive(Debug)]
pub struct SegmentBuilder {
    ordinal: u32,
    doc_count: u32,
    numeric: AHashMap<String, Vec<(u32, Vec<i64>)>>,
    keywords: AHashMap<String, Vec<(u32, Vec<Vec<u8>>)>>,
    stored: Vec<Vec<(String, StoredValue)>>,
}

impl SegmentBuilder {
    pub fn new(ordinal: u32) -> SegmentBuilder {
        SegmentBuilder {
            ordinal,
            doc_count: 0,
            numeric: AHashMap::new(),
            keywords: AHashMap::new(),
            stored: Vec::new(),
        }
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// Starts a new document and returns its doc id.
    pub fn start_document(&mut self) -> u32 {
        self.doc_count += 1;
        self.stored.push(Vec::new());
        self.doc_count - 1
    }

    fn current_doc(&self) -> u32 {
        assert!(self.doc_count > 0, "no document started");
        self.doc_count - 1
    }

    pub fn add_long_doc_values(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = i64>,
    ) -> &mut Self {
        let doc = self.current_doc();
        let values = values.into_iter().collect::<Vec<_>>();
        if !values.is_empty() {
            push_doc_values(self.numeric.entry(field.to_string()).or_default(), doc, values);
        }
        self
    }

    /// Doubles are stored as sortable longs.
    pub fn add_double_doc_values(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = f64>,
    ) -> &mut Self {
        self.add_long_doc_values(field, values.into_iter().map(double_to_sortable_long))
    }

    /// Booleans are stored as `0` and `1`.
    pub fn add_boolean_doc_values(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = bool>,
    ) -> &mut Self {
        self.add_long_doc_values(field, values.into_iter().map(i64::from))
    }

    pub fn add_keyword_doc_values<T: AsRef<[u8]>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = T>,
    ) -> &mut Self {
        let doc = self.current_doc();
        let values = values
            .into_iter()
            .map(|v| v.as_ref().to_vec())
            .collect::<Vec<_>>();
        if !values.is_empty() {
            push_doc_values(
                self.keywords.entry(field.to_string()).or_default(),
                doc,
                values,
            );
        }
        self
    }

    pub fn add_stored_value(&mut self, field: &str, value: StoredValue) -> &mut Self {
        let doc = self.current_doc() as usize;
        self.stored[doc].push((field.to_string(), value));
        self
    }

    /// Keeps `source` verbatim as the document's `_source` stored field.
    pub fn set_source(&mut self, source: &JsonValue) -> Result<&mut Self> {
        verify_arg!(source, source.is_object());
        let bytes = serde_json::to_vec(source)
            .map_err(|e| Error::invalid_arg("source", e.to_string()))?;
        Ok(self.add_stored_value(SOURCE_FIELD, StoredValue::Bytes(bytes)))
    }

    pub fn build(self) -> Result<MemorySegment> {
        let max_doc = self.doc_count;

        let numeric = self
            .numeric
            .into_iter()
            .map(|(field, docs)| {
                let data = build_numeric(max_doc, docs);
                (field, Arc::new(data))
            })
            .collect();

        let ordinals = self
            .keywords
            .into_iter()
            .map(|(field, docs)| {
                let data = build_ordinals(max_doc, docs);
                (field, Arc::new(data))
            })
            .collect();

        let stored = self
            .stored
            .iter()
            .map(|fields| encode_record(fields.iter().map(|(name, value)| (name.as_str(), value))))
            .collect::<Result<Vec<_>>>()?;

        Ok(MemorySegment {
            ordinal: self.ordinal,
            max_doc,
            numeric,
            ordinals,
            stored: Arc::new(stored),
            documents_loaded: Default::default(),
        })
    }
}

fn push_doc_values<T>(docs: &mut Vec<(u32, Vec<T>)>, doc: u32, values: Vec<T>) {
    match docs.last_mut() {
        Some((last, existing)) if *last == doc => existing.extend(values),
        _ => docs.push((doc, values)),
    }
}

fn build_numeric(max_doc: u32, docs: Vec<(u32, Vec<i64>)>) -> NumericData {
    let mut offsets = Vec::with_capacity(max_doc as usize + 1);
    let mut values = Vec::new();
    let mut singleton = true;
    let mut docs = docs.into_iter().peekable();
    offsets.push(0);
    for doc in 0..max_doc {
        if let Some((_, mut doc_values)) = docs.next_if(|(d, _)| *d == doc) {
            doc_values.sort_unstable();
            singleton &= doc_values.len() <= 1;
            values.extend(doc_values);
        }
        offsets.push(values.len() as u32);
    }
    NumericData {
        offsets,
        values,
        singleton,
    }
}

fn build_ordinals(max_doc: u32, docs: Vec<(u32, Vec<Vec<u8>>)>) -> OrdinalData {
    let mut dictionary = docs
        .iter()
        .flat_map(|(_, values)| values.iter().cloned())
        .collect::<Vec<_>>();
    dictionary.sort_unstable();
    dictionary.dedup();

    let mut offsets = Vec::with_capacity(max_doc as usize + 1);
    let mut ords = Vec::new();
    let mut singleton = true;
    let mut docs = docs.into_iter().peekable();
    offsets.push(0);
    for doc in 0..max_doc {
        if let Some((_, doc_values)) = docs.next_if(|(d, _)| *d == doc) {
            let mut doc_ords = doc_values
                .iter()
                .filter_map(|v| dictionary.binary_search(v).ok())
                .map(|ord| ord as u32)
                .collect::<Vec<_>>();
            doc_ords.sort_unstable();
            doc_ords.dedup();
            singleton &= doc_ords.len() <= 1;
            ords.extend(doc_ords);
        }
        offsets.push(ords.len() as u32);
    }
    OrdinalData {
        dictionary,
        offsets,
        ords,
        singleton,
    }
}
