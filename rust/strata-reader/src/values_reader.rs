//! The values reader operator.
//!
//! Per page the operator picks one of two shapes:
//!
//! - When every run of positions sharing a segment has non-decreasing doc
//!   ids, each run is read column-at-a-time where the field's loader offers a
//!   column reader, and row-stride otherwise.
//! - Otherwise all positions are visited in (shard, segment, doc) order with
//!   row-stride readers, and the result is permuted back to input order.
//!
//! Ordinal fields always read in sorted order through their ordinals reader.
//! Readers are cached per segment and rebuilt when they cannot serve a read
//! that starts behind their position.

use std::{fmt, sync::Arc};

use itertools::Itertools;
use strata_block::{
    block::Block,
    doc::{DocVector, SegmentRun},
    element_type::ElementType,
    page::Page,
};
use strata_common::{Result, error::Error, result::verify_shard_index, verify_arg};
use strata_keyed_vector::KeyedVector;
use strata_loader::{
    block_loader::{BlockLoader, ColumnAtATimeReader, RowStrideReader},
    stored_field_loader::StoredFieldLoader,
};
use strata_segment::{segment::SegmentReader, stored::StoredFieldsSpec};

use crate::{
    config::ReaderConfig,
    field::{FieldExtract, FieldInfo, ShardContext},
    operator::Operator,
    status::{ReaderCounters, Status},
};

const COLUMN_AT_A_TIME: &str = "column_at_a_time";
const ROW_STRIDE: &str = "row_stride";
const ORDINALS: &str = "ordinals";

/// Builds [`ValuesReaderOperator`]s sharing one field list and shard set.
pub struct ValuesReaderOperatorFactory {
    fields: Vec<FieldInfo>,
    shard_contexts: Arc<[ShardContext]>,
    doc_channel: usize,
    partition: usize,
    config: ReaderConfig,
}

impl ValuesReaderOperatorFactory {
    /// `doc_channel` is the index of the doc reference block in the input
    /// pages.
    pub fn new(
        fields: Vec<FieldInfo>,
        shard_contexts: Vec<ShardContext>,
        doc_channel: usize,
    ) -> ValuesReaderOperatorFactory {
        ValuesReaderOperatorFactory {
            fields,
            shard_contexts: shard_contexts.into(),
            doc_channel,
            partition: 0,
            config: ReaderConfig::default(),
        }
    }

    /// Sets the partition index reported in logs.
    pub fn with_partition(mut self, partition: usize) -> ValuesReaderOperatorFactory {
        self.partition = partition;
        self
    }

    pub fn with_config(mut self, config: ReaderConfig) -> ValuesReaderOperatorFactory {
        self.config = config;
        self
    }

    pub fn describe(&self) -> String {
        describe(
            self.fields.iter().map(|f| f.name.as_str()),
            self.config.describe_field_limit,
        )
    }

    /// Creates an operator, resolving the loader of every field on every
    /// shard. A loader of the wrong type, or an ordinals request on a field
    /// without ordinals, fails here.
    pub fn get(&self) -> Result<ValuesReaderOperator> {
        self.config.validate()?;
        let fields = self
            .fields
            .iter()
            .map(|info| self.resolve_field(info))
            .collect::<Result<Vec<_>>>()?;

        let mut shard_bases = Vec::with_capacity(self.shard_contexts.len());
        let mut base = 0;
        for shard in self.shard_contexts.iter() {
            shard_bases.push(base);
            base += shard.reader.segment_count();
        }

        let operator = ValuesReaderOperator {
            fields,
            shards: self.shard_contexts.clone(),
            shard_bases,
            doc_channel: self.doc_channel,
            partition: self.partition,
            config: self.config.clone(),
            segments: KeyedVector::new(),
            counters: ReaderCounters::default(),
            pages_processed: 0,
            output: None,
            finished: false,
        };
        log::debug!(
            "created {operator} for partition {} over {} shards",
            self.partition,
            self.shard_contexts.len()
        );
        Ok(operator)
    }

    fn resolve_field(&self, info: &FieldInfo) -> Result<FieldState> {
        let loaders = (0..self.shard_contexts.len())
            .map(|shard| {
                let loader = info.loader(shard)?;
                match info.extract {
                    FieldExtract::Values => {
                        let loaded = loader.element_type();
                        if loaded != info.element_type && loaded != ElementType::Null {
                            return Err(Error::invalid_arg(
                                info.name.as_str(),
                                format!(
                                    "loader for shard [{shard}] produces [{loaded}], expected [{}]",
                                    info.element_type
                                ),
                            ));
                        }
                    }
                    FieldExtract::Ordinals => {
                        if !loader.supports_ordinals() {
                            return Err(Error::invalid_arg(
                                info.name.as_str(),
                                format!("loader for shard [{shard}] does not support ordinals"),
                            ));
                        }
                    }
                }
                Ok(loader)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FieldState {
            name: info.name.clone(),
            output_type: info.output_type(),
            extract: info.extract,
            loaders,
        })
    }
}

impl fmt::Display for ValuesReaderOperatorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn describe<'a>(names: impl ExactSizeIterator<Item = &'a str>, limit: usize) -> String {
    if names.len() >= limit {
        format!("ValuesReaderOperator[fields = [{} fields]]", names.len())
    } else {
        format!("ValuesReaderOperator[fields = [{}]]", names.format(", "))
    }
}

struct FieldState {
    name: String,
    output_type: ElementType,
    extract: FieldExtract,
    /// Indexed by shard.
    loaders: Vec<Arc<dyn BlockLoader>>,
}

/// Dense key of a segment across the operator's shard set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SegmentKey(usize);

impl From<usize> for SegmentKey {
    fn from(value: usize) -> Self {
        SegmentKey(value)
    }
}

impl From<SegmentKey> for usize {
    fn from(value: SegmentKey) -> Self {
        value.0
    }
}

struct SegmentState {
    shard: usize,
    segment: Arc<dyn SegmentReader>,
    /// Indexed by field.
    readers: Vec<FieldReaders>,
}

#[derive(Default)]
struct FieldReaders {
    column: Option<ColumnReader>,
    row_stride: Option<Box<dyn RowStrideReader>>,
    ordinals: Option<Box<dyn ColumnAtATimeReader>>,
}

enum ColumnReader {
    /// The loader has no column reader for this segment.
    Unsupported,
    Ready(Box<dyn ColumnAtATimeReader>),
}

/// Appends one block per requested field to each page.
pub struct ValuesReaderOperator {
    fields: Vec<FieldState>,
    shards: Arc<[ShardContext]>,
    /// Key of segment 0 of each shard.
    shard_bases: Vec<usize>,
    doc_channel: usize,
    partition: usize,
    config: ReaderConfig,
    segments: KeyedVector<SegmentKey, SegmentState>,
    counters: ReaderCounters,
    pages_processed: usize,
    output: Option<Page>,
    finished: bool,
}

impl ValuesReaderOperator {
    pub fn status(&self) -> Status {
        Status::new(self.pages_processed, self.counters.totals().clone())
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    /// Loads every field for `page` and returns the page with the field
    /// blocks appended. Reader usage of a failed page is not counted.
    pub fn process(&mut self, page: &Page) -> Result<Page> {
        match self.read_page(page) {
            Ok(output) => {
                self.counters.end_page();
                self.pages_processed += 1;
                Ok(output)
            }
            Err(e) => {
                self.counters.discard_page();
                log::warn!(
                    "{self} failed on a page of {} positions: {e}",
                    page.position_count()
                );
                Err(e)
            }
        }
    }

    fn read_page(&mut self, page: &Page) -> Result<Page> {
        verify_arg!(doc_channel, self.doc_channel < page.block_count());
        let docs = page
            .block(self.doc_channel)
            .as_doc_vector()
            .ok_or_else(|| {
                Error::invalid_arg(
                    "doc_channel",
                    format!("block [{}] is not a doc block", self.doc_channel),
                )
            })?;

        let mut blocks = self
            .fields
            .iter()
            .map(|f| Block::empty(f.output_type))
            .collect::<Vec<_>>();
        if docs.is_empty() {
            return Ok(page.append_blocks(blocks));
        }
        for &shard in docs.shards().iter().dedup() {
            verify_shard_index(shard as usize, self.shards.len())?;
        }

        let (value_fields, ordinal_fields): (Vec<usize>, Vec<usize>) = (0..self.fields.len())
            .partition(|&f| self.fields[f].extract == FieldExtract::Values);

        if !value_fields.is_empty() {
            match docs.segment_runs() {
                Some(runs) => {
                    log::trace!(
                        "{self}: {} positions in {} ordered runs",
                        docs.len(),
                        runs.len()
                    );
                    self.load_runs(docs, runs, &value_fields, &mut blocks)?;
                }
                None => {
                    log::trace!("{self}: {} unordered positions", docs.len());
                    self.load_unordered(docs, &value_fields, &mut blocks)?;
                }
            }
        }
        if !ordinal_fields.is_empty() {
            self.load_ordinals(docs, &ordinal_fields, &mut blocks)?;
        }

        for (block, field) in blocks.iter_mut().zip(&self.fields) {
            if block.element_type() == ElementType::Null && field.output_type != ElementType::Null
            {
                *block = Block::constant_nulls(field.output_type, block.position_count());
            }
        }
        Ok(page.append_blocks(blocks))
    }

    fn load_runs(
        &mut self,
        docs: &DocVector,
        runs: &[SegmentRun],
        value_fields: &[usize],
        out: &mut [Block],
    ) -> Result<()> {
        let mut pieces = vec![Vec::with_capacity(runs.len()); self.fields.len()];
        for run in runs {
            let doc_ids = &docs.docs()[run.positions()];
            let key = self.segment_key(run.shard, run.segment)?;
            let mut row_stride = Vec::new();
            for &f in value_fields {
                let block = if self.config.column_at_a_time {
                    self.read_column(key, f, doc_ids)?
                } else {
                    None
                };
                match block {
                    Some(block) => pieces[f].push(block),
                    None => row_stride.push(f),
                }
            }
            if !row_stride.is_empty() {
                let blocks = self.read_row_stride(key, doc_ids, &row_stride)?;
                for (f, block) in row_stride.into_iter().zip(blocks) {
                    pieces[f].push(block);
                }
            }
        }
        for &f in value_fields {
            out[f] = Block::concat(&pieces[f]);
        }
        Ok(())
    }

    fn load_unordered(
        &mut self,
        docs: &DocVector,
        value_fields: &[usize],
        out: &mut [Block],
    ) -> Result<()> {
        let groups = sorted_segment_groups(docs);
        let mut pieces = vec![Vec::with_capacity(groups.len()); self.fields.len()];
        for (shard, segment, doc_ids) in &groups {
            let key = self.segment_key(*shard, *segment)?;
            let blocks = self.read_row_stride(key, doc_ids, value_fields)?;
            for (&f, block) in value_fields.iter().zip(blocks) {
                pieces[f].push(block);
            }
        }
        let backwards = docs.shard_segment_doc_map_backwards();
        for &f in value_fields {
            out[f] = Block::concat(&pieces[f]).filter(backwards);
        }
        Ok(())
    }

    fn load_ordinals(
        &mut self,
        docs: &DocVector,
        ordinal_fields: &[usize],
        out: &mut [Block],
    ) -> Result<()> {
        let groups = sorted_segment_groups(docs);
        let mut pieces = vec![Vec::with_capacity(groups.len()); self.fields.len()];
        for (shard, segment, doc_ids) in &groups {
            let key = self.segment_key(*shard, *segment)?;
            for &f in ordinal_fields {
                pieces[f].push(self.read_ordinals(key, f, doc_ids)?);
            }
        }
        let backwards = docs.shard_segment_doc_map_backwards();
        for &f in ordinal_fields {
            out[f] = Block::concat(&pieces[f]).filter(backwards);
        }
        Ok(())
    }

    /// Returns the cache key of a segment, creating its reader slots on first
    /// use.
    fn segment_key(&mut self, shard: u32, segment: u32) -> Result<SegmentKey> {
        let shard = shard as usize;
        verify_shard_index(shard, self.shards.len())?;
        let reader = self.shards[shard].reader.segment(segment)?;
        let key = SegmentKey(self.shard_bases[shard] + segment as usize);
        if !self.segments.contains_key(key) {
            let reader = reader.clone();
            let readers = (0..self.fields.len())
                .map(|_| FieldReaders::default())
                .collect();
            self.segments.push_entry(
                key,
                SegmentState {
                    shard,
                    segment: reader,
                    readers,
                },
            );
        }
        Ok(key)
    }

    fn segment_state<'a>(
        segments: &'a mut KeyedVector<SegmentKey, SegmentState>,
        key: SegmentKey,
    ) -> Result<&'a mut SegmentState> {
        segments
            .get_mut(key)
            .ok_or_else(|| Error::invalid_operation("segment readers were not initialized"))
    }

    /// Reads `docs` with the field's column reader, or returns `None` when the
    /// loader has none for this segment.
    fn read_column(&mut self, key: SegmentKey, field: usize, docs: &[u32]) -> Result<Option<Block>> {
        let Self {
            fields,
            segments,
            counters,
            ..
        } = self;
        let info = &fields[field];
        let state = Self::segment_state(segments, key)?;
        let loader = &info.loaders[state.shard];
        let slot = &mut state.readers[field];

        let stale = match &slot.column {
            None => true,
            Some(ColumnReader::Unsupported) => false,
            Some(ColumnReader::Ready(reader)) => !reader.can_reuse(docs[0]),
        };
        if stale {
            slot.column = Some(match loader.column_at_a_time_reader(&state.segment)? {
                Some(reader) => ColumnReader::Ready(reader),
                None => ColumnReader::Unsupported,
            });
        }

        match &mut slot.column {
            Some(ColumnReader::Ready(reader)) => {
                let block = reader.read(docs)?;
                counters.record(&info.name, COLUMN_AT_A_TIME, reader);
                Ok(Some(block))
            }
            _ => {
                counters.record(&info.name, COLUMN_AT_A_TIME, "null");
                Ok(None)
            }
        }
    }

    /// Reads `docs` of one segment with the row-stride readers of `field_indexes`,
    /// sharing one stored field loader, and returns one finished block per
    /// field.
    fn read_row_stride(
        &mut self,
        key: SegmentKey,
        docs: &[u32],
        field_indexes: &[usize],
    ) -> Result<Vec<Block>> {
        let sequential =
            docs.len() >= self.config.sequential_stored_fields_threshold && is_contiguous(docs);
        let Self {
            fields,
            shards,
            segments,
            counters,
            ..
        } = self;
        let state = Self::segment_state(segments, key)?;
        let shard = state.shard;

        let spec = field_indexes
            .iter()
            .fold(StoredFieldsSpec::NO_REQUIREMENTS, |spec, &f| {
                spec.merge(&fields[f].loaders[shard].row_stride_stored_fields_spec())
            });
        let source_loader = spec
            .requires_source
            .then(|| (shards[shard].source_loader)());
        let mut stored =
            StoredFieldLoader::new(state.segment.as_ref(), spec, source_loader, sequential)?;
        counters.record_key(stored.to_string());
        if stored.is_sequential() {
            log::trace!(
                "loading stored fields of docs {}..={} sequentially",
                docs[0],
                docs[docs.len() - 1]
            );
        }

        let mut readers = Vec::with_capacity(field_indexes.len());
        for &f in field_indexes {
            let loader = &fields[f].loaders[shard];
            let reader = match state.readers[f].row_stride.take() {
                Some(reader) if reader.can_reuse(docs[0]) => reader,
                _ => loader.row_stride_reader(&state.segment)?,
            };
            readers.push((reader, loader.row_stride_builder(docs.len())));
        }

        for &doc in docs {
            stored.advance_to(doc)?;
            for (reader, builder) in readers.iter_mut() {
                reader.read(doc, &stored, builder)?;
            }
        }

        let mut blocks = Vec::with_capacity(field_indexes.len());
        for (&f, (reader, mut builder)) in field_indexes.iter().zip(readers) {
            let info = &fields[f];
            counters.record(&info.name, ROW_STRIDE, &reader);
            blocks.push(info.loaders[shard].finish_row_stride(builder.build())?);
            state.readers[f].row_stride = Some(reader);
        }
        Ok(blocks)
    }

    fn read_ordinals(&mut self, key: SegmentKey, field: usize, docs: &[u32]) -> Result<Block> {
        let Self {
            fields,
            segments,
            counters,
            ..
        } = self;
        let info = &fields[field];
        let state = Self::segment_state(segments, key)?;
        let loader = &info.loaders[state.shard];
        let mut reader = match state.readers[field].ordinals.take() {
            Some(reader) if reader.can_reuse(docs[0]) => reader,
            _ => loader.ordinals_reader(&state.segment)?,
        };
        let block = reader.read(docs)?;
        counters.record(&info.name, ORDINALS, &reader);
        state.readers[field].ordinals = Some(reader);
        Ok(block)
    }
}

/// Groups the positions of `docs` in (shard, segment, doc) order, one group
/// per segment.
fn sorted_segment_groups(docs: &DocVector) -> Vec<(u32, u32, Vec<u32>)> {
    docs.shard_segment_doc_map_forwards()
        .iter()
        .chunk_by(|&&p| (docs.shard(p), docs.segment(p)))
        .into_iter()
        .map(|((shard, segment), positions)| {
            (shard, segment, positions.map(|&p| docs.doc(p)).collect())
        })
        .collect()
}

fn is_contiguous(docs: &[u32]) -> bool {
    docs.windows(2).all(|w| w[1] == w[0] + 1)
}

impl Operator for ValuesReaderOperator {
    fn name(&self) -> &str {
        "ValuesReaderOperator"
    }

    fn needs_input(&self) -> bool {
        self.output.is_none() && !self.finished
    }

    fn add_input(&mut self, page: Page) -> Result<()> {
        let output = self.process(&page)?;
        self.output = Some(output);
        Ok(())
    }

    fn get_output(&mut self) -> Result<Option<Page>> {
        Ok(self.output.take())
    }

    fn finish(&mut self) {
        self.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.finished && self.output.is_none()
    }

    fn status(&self) -> Option<serde_json::Value> {
        Some(Self::status(self).to_json())
    }

    fn close(&mut self) {
        self.segments.clear();
    }
}

impl fmt::Debug for ValuesReaderOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for ValuesReaderOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(
            self.fields.iter().map(|field| field.name.as_str()),
            self.config.describe_field_limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_loader::{
        constant::ConstantNullsLoader,
        doc_values::{NumericDocValuesLoader, NumericKind},
    };
    use strata_segment::{memory::SegmentBuilder, segment::ShardReader};

    fn shard(docs_per_segment: &[u32]) -> ShardContext {
        let mut value = 0;
        let segments = docs_per_segment
            .iter()
            .enumerate()
            .map(|(ordinal, &count)| {
                let mut builder = SegmentBuilder::new(ordinal as u32);
                for _ in 0..count {
                    builder.start_document();
                    builder.add_long_doc_values("n", [value]);
                    value += 1;
                }
                Arc::new(builder.build().unwrap()) as Arc<dyn SegmentReader>
            })
            .collect();
        ShardContext::new(ShardReader::new(segments))
    }

    fn long_field() -> FieldInfo {
        FieldInfo::shared("n", Arc::new(NumericDocValuesLoader::new("n", NumericKind::Long)))
    }

    fn doc_page(shards: Vec<u32>, segments: Vec<u32>, docs: Vec<u32>) -> Page {
        Page::new(vec![Block::from_docs(DocVector::new(shards, segments, docs))])
    }

    #[test]
    fn test_describe() {
        let factory = ValuesReaderOperatorFactory::new(vec![long_field()], vec![shard(&[1])], 0);
        assert_eq!(factory.describe(), "ValuesReaderOperator[fields = [n]]");
        let fields = (0..10).map(|_| long_field()).collect();
        let factory = ValuesReaderOperatorFactory::new(fields, vec![shard(&[1])], 0);
        assert_eq!(factory.describe(), "ValuesReaderOperator[fields = [10 fields]]");
        assert_eq!(factory.get().unwrap().to_string(), factory.describe());
    }

    #[test]
    fn test_ordered_and_unordered_pages_agree() {
        let factory = ValuesReaderOperatorFactory::new(vec![long_field()], vec![shard(&[3, 2])], 0);
        let mut op = factory.get().unwrap();
        let ordered = op
            .process(&doc_page(vec![0; 4], vec![0, 0, 1, 1], vec![0, 2, 0, 1]))
            .unwrap();
        assert_eq!(ordered.block(1), &Block::from_longs(vec![0, 2, 3, 4]));

        let interleaved = op
            .process(&doc_page(vec![0; 4], vec![1, 0, 1, 0], vec![1, 2, 0, 0]))
            .unwrap();
        assert_eq!(interleaved.block(1), &Block::from_longs(vec![4, 2, 3, 0]));

        op.add_input(doc_page(vec![0; 4], vec![0, 0, 1, 1], vec![2, 0, 1, 0]))
            .unwrap();
        let unordered = op.get_output().unwrap().unwrap();
        assert_eq!(unordered.block(1), &Block::from_longs(vec![2, 0, 4, 3]));

        let status = op.status();
        assert_eq!(status.pages_processed, 3);
        assert!(status.readers_built.contains_key("n:row_stride:DocValues.SingletonLongs"));
        assert!(status.readers_built.contains_key("n:column_at_a_time:DocValues.SingletonLongs"));
    }

    #[test]
    fn test_rejects_bad_shard() {
        let factory = ValuesReaderOperatorFactory::new(vec![long_field()], vec![shard(&[2])], 0);
        let mut op = factory.get().unwrap();
        let err = op.process(&doc_page(vec![1], vec![0], vec![0])).unwrap_err();
        assert!(err.is_configuration_fault());
    }

    #[test]
    fn test_rejects_mistyped_loader() {
        let field = FieldInfo::new("n", ElementType::Int, |_| {
            Ok(Arc::new(NumericDocValuesLoader::new("n", NumericKind::Long)) as Arc<dyn BlockLoader>)
        });
        let factory = ValuesReaderOperatorFactory::new(vec![field], vec![shard(&[1])], 0);
        assert!(factory.get().unwrap_err().is_configuration_fault());

        let field = long_field().with_extract(FieldExtract::Ordinals);
        let factory = ValuesReaderOperatorFactory::new(vec![field], vec![shard(&[1])], 0);
        assert!(factory.get().unwrap_err().is_configuration_fault());
    }

    #[test]
    fn test_null_typed_loader_takes_field_type() {
        let field = FieldInfo::new("missing", ElementType::Double, |_| {
            Ok(Arc::new(ConstantNullsLoader::new(ElementType::Null)) as Arc<dyn BlockLoader>)
        });
        let factory = ValuesReaderOperatorFactory::new(vec![field], vec![shard(&[2])], 0);
        let mut op = factory.get().unwrap();
        let page = op.process(&doc_page(vec![0, 0], vec![0, 0], vec![0, 1])).unwrap();
        assert_eq!(page.block(1).element_type(), ElementType::Double);
        assert!(page.block(1).are_all_values_null());
    }

    #[test]
    fn test_debug_matches_description() {
        let factory = ValuesReaderOperatorFactory::new(vec![long_field()], vec![shard(&[1])], 0);
        let op = factory.get().unwrap();
        assert_eq!(format!("{op:?}"), "ValuesReaderOperator[fields = [n]]");
    }

    #[test]
    fn test_contiguous() {
        assert!(is_contiguous(&[]));
        assert!(is_contiguous(&[4, 5, 6]));
        assert!(!is_contiguous(&[4, 6]));
        assert!(!is_contiguous(&[4, 4]));
    }
}
