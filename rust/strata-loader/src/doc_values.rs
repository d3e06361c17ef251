//! Loaders backed by doc values.
//!
//! Numeric multi-values come out of the column sorted ascending with
//! duplicates. Keyword multi-values are dictionary ordinals, unique and sorted,
//! so their bytes are deduplicated and sorted ascending as well.

use std::{fmt, sync::Arc};

use strata_block::{
    block::Block,
    builder::BlockBuilder,
    element_type::{ElementType, MvOrdering},
};
use strata_common::Result;
use strata_segment::{
    doc_values::{NumericColumn, OrdinalsColumn, sortable_long_to_double},
    segment::SegmentReader,
    stored::StoredFieldsSpec,
};

use crate::{
    block_loader::{BlockLoader, ColumnAtATimeReader, RowStrideReader},
    constant::ConstantNullsReader,
    stored_field_loader::StoredFieldLoader,
};

/// How the raw longs of a numeric column map to block values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Long,
    Int,
    Double,
    Boolean,
}

impl NumericKind {
    pub fn element_type(&self) -> ElementType {
        match self {
            NumericKind::Long => ElementType::Long,
            NumericKind::Int => ElementType::Int,
            NumericKind::Double => ElementType::Double,
            NumericKind::Boolean => ElementType::Boolean,
        }
    }

    fn plural_name(&self) -> &'static str {
        match self {
            NumericKind::Long => "Longs",
            NumericKind::Int => "Ints",
            NumericKind::Double => "Doubles",
            NumericKind::Boolean => "Booleans",
        }
    }

    #[inline]
    fn append(&self, raw: i64, builder: &mut BlockBuilder) {
        match self {
            NumericKind::Long => builder.append_long(raw),
            NumericKind::Int => builder.append_int(raw as i32),
            NumericKind::Double => builder.append_double(sortable_long_to_double(raw)),
            NumericKind::Boolean => builder.append_boolean(raw != 0),
        }
    }
}

/// Loads a numeric field from its doc values.
#[derive(Debug, Clone)]
pub struct NumericDocValuesLoader {
    field: String,
    kind: NumericKind,
}

impl NumericDocValuesLoader {
    pub fn new(field: impl Into<String>, kind: NumericKind) -> NumericDocValuesLoader {
        NumericDocValuesLoader {
            field: field.into(),
            kind,
        }
    }

    fn open(&self, segment: &Arc<dyn SegmentReader>) -> Result<Option<NumericReader>> {
        Ok(segment
            .numeric_doc_values(&self.field)?
            .map(|column| NumericReader {
                segment: segment.clone(),
                field: self.field.clone(),
                kind: self.kind,
                column,
                last_doc: None,
            }))
    }
}

impl BlockLoader for NumericDocValuesLoader {
    fn element_type(&self) -> ElementType {
        self.kind.element_type()
    }

    fn column_at_a_time_reader(
        &self,
        segment: &Arc<dyn SegmentReader>,
    ) -> Result<Option<Box<dyn ColumnAtATimeReader>>> {
        Ok(Some(match self.open(segment)? {
            Some(reader) => Box::new(reader),
            None => Box::new(ConstantNullsReader::new(self.element_type())),
        }))
    }

    fn row_stride_reader(
        &self,
        segment: &Arc<dyn SegmentReader>,
    ) -> Result<Box<dyn RowStrideReader>> {
        Ok(match self.open(segment)? {
            Some(reader) => Box::new(reader),
            None => Box::new(ConstantNullsReader::new(self.element_type())),
        })
    }

    fn row_stride_stored_fields_spec(&self) -> StoredFieldsSpec {
        StoredFieldsSpec::NO_REQUIREMENTS
    }

    fn row_stride_ordering(&self) -> MvOrdering {
        MvOrdering::SortedAscending
    }
}

/// Reads a numeric doc values column. Serves both access modes: column reads
/// must move forward, row-stride reads reopen the column when asked for an
/// earlier document.
pub struct NumericReader {
    segment: Arc<dyn SegmentReader>,
    field: String,
    kind: NumericKind,
    column: NumericColumn,
    last_doc: Option<u32>,
}

impl NumericReader {
    fn read_doc(&mut self, doc: u32, builder: &mut BlockBuilder) -> Result<()> {
        self.last_doc = Some(doc);
        match &mut self.column {
            NumericColumn::Singleton(dv) => {
                if dv.advance_exact(doc)? {
                    self.kind.append(dv.long_value(), builder);
                } else {
                    builder.append_null();
                }
            }
            NumericColumn::Multi(dv) => {
                if !dv.advance_exact(doc)? {
                    builder.append_null();
                    return Ok(());
                }
                let count = dv.doc_value_count();
                if count == 1 {
                    self.kind.append(dv.next_value(), builder);
                    return Ok(());
                }
                builder.begin_position_entry();
                for _ in 0..count {
                    self.kind.append(dv.next_value(), builder);
                }
                builder.end_position_entry();
            }
        }
        Ok(())
    }

    fn rewind_if_behind(&mut self, doc: u32) -> Result<()> {
        if self.last_doc.is_some_and(|last| doc < last) {
            if let Some(column) = self.segment.numeric_doc_values(&self.field)? {
                self.column = column;
                self.last_doc = None;
            }
        }
        Ok(())
    }
}

impl ColumnAtATimeReader for NumericReader {
    fn read(&mut self, docs: &[u32]) -> Result<Block> {
        let mut builder = BlockBuilder::with_capacity(self.kind.element_type(), docs.len());
        for &doc in docs {
            self.read_doc(doc, &mut builder)?;
        }
        if matches!(self.column, NumericColumn::Multi(_)) {
            builder.mv_ordering(MvOrdering::SortedAscending);
        }
        Ok(builder.build())
    }

    fn can_reuse(&self, starting_doc: u32) -> bool {
        self.last_doc.is_none_or(|last| last <= starting_doc)
    }
}

impl RowStrideReader for NumericReader {
    fn read(
        &mut self,
        doc: u32,
        _stored: &StoredFieldLoader,
        builder: &mut BlockBuilder,
    ) -> Result<()> {
        self.rewind_if_behind(doc)?;
        self.read_doc(doc, builder)
    }

    fn can_reuse(&self, _starting_doc: u32) -> bool {
        true
    }
}

impl fmt::Display for NumericReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            NumericColumn::Singleton(_) => {
                write!(f, "DocValues.Singleton{}", self.kind.plural_name())
            }
            NumericColumn::Multi(_) => write!(f, "DocValues.{}", self.kind.plural_name()),
        }
    }
}

/// Loads a keyword field from its dictionary-encoded doc values.
#[derive(Debug, Clone)]
pub struct BytesDocValuesLoader {
    field: String,
}

impl BytesDocValuesLoader {
    pub fn new(field: impl Into<String>) -> BytesDocValuesLoader {
        BytesDocValuesLoader {
            field: field.into(),
        }
    }

    fn open(
        &self,
        segment: &Arc<dyn SegmentReader>,
        emit_ordinals: bool,
    ) -> Result<Option<OrdinalsReader>> {
        Ok(segment
            .ordinal_doc_values(&self.field)?
            .map(|column| OrdinalsReader {
                segment: segment.clone(),
                field: self.field.clone(),
                column,
                emit_ordinals,
                last_doc: None,
            }))
    }
}

impl BlockLoader for BytesDocValuesLoader {
    fn element_type(&self) -> ElementType {
        ElementType::Bytes
    }

    fn column_at_a_time_reader(
        &self,
        segment: &Arc<dyn SegmentReader>,
    ) -> Result<Option<Box<dyn ColumnAtATimeReader>>> {
        Ok(Some(match self.open(segment, false)? {
            Some(reader) => Box::new(reader),
            None => Box::new(ConstantNullsReader::new(ElementType::Bytes)),
        }))
    }

    fn row_stride_reader(
        &self,
        segment: &Arc<dyn SegmentReader>,
    ) -> Result<Box<dyn RowStrideReader>> {
        Ok(match self.open(segment, false)? {
            Some(reader) => Box::new(reader),
            None => Box::new(ConstantNullsReader::new(ElementType::Bytes)),
        })
    }

    fn row_stride_stored_fields_spec(&self) -> StoredFieldsSpec {
        StoredFieldsSpec::NO_REQUIREMENTS
    }

    fn row_stride_ordering(&self) -> MvOrdering {
        MvOrdering::DeduplicatedAndSortedAscending
    }

    fn supports_ordinals(&self) -> bool {
        true
    }

    fn ordinals_reader(
        &self,
        segment: &Arc<dyn SegmentReader>,
    ) -> Result<Box<dyn ColumnAtATimeReader>> {
        Ok(match self.open(segment, true)? {
            Some(reader) => Box::new(reader),
            None => Box::new(ConstantNullsReader::new(ElementType::Int)),
        })
    }
}

/// Reads a dictionary-encoded column, either as the looked-up bytes or as the
/// raw ordinals.
pub struct OrdinalsReader {
    segment: Arc<dyn SegmentReader>,
    field: String,
    column: OrdinalsColumn,
    emit_ordinals: bool,
    last_doc: Option<u32>,
}

impl OrdinalsReader {
    fn element_type(&self) -> ElementType {
        if self.emit_ordinals {
            ElementType::Int
        } else {
            ElementType::Bytes
        }
    }

    fn read_doc(&mut self, doc: u32, builder: &mut BlockBuilder) -> Result<()> {
        self.last_doc = Some(doc);
        match &mut self.column {
            OrdinalsColumn::Singleton(dv) => {
                if !dv.advance_exact(doc)? {
                    builder.append_null();
                } else if self.emit_ordinals {
                    builder.append_int(dv.ord() as i32);
                } else {
                    builder.append_bytes(dv.lookup_ord(dv.ord())?);
                }
            }
            OrdinalsColumn::Multi(dv) => {
                if !dv.advance_exact(doc)? {
                    builder.append_null();
                    return Ok(());
                }
                let count = dv.doc_value_count();
                if count > 1 {
                    builder.begin_position_entry();
                }
                for _ in 0..count {
                    let ord = dv.next_ord();
                    if self.emit_ordinals {
                        builder.append_int(ord as i32);
                    } else {
                        builder.append_bytes(dv.lookup_ord(ord)?);
                    }
                }
                if count > 1 {
                    builder.end_position_entry();
                }
            }
        }
        Ok(())
    }

    fn rewind_if_behind(&mut self, doc: u32) -> Result<()> {
        if self.last_doc.is_some_and(|last| doc < last) {
            if let Some(column) = self.segment.ordinal_doc_values(&self.field)? {
                self.column = column;
                self.last_doc = None;
            }
        }
        Ok(())
    }
}

impl ColumnAtATimeReader for OrdinalsReader {
    fn read(&mut self, docs: &[u32]) -> Result<Block> {
        let mut builder = BlockBuilder::with_capacity(self.element_type(), docs.len());
        for &doc in docs {
            self.read_doc(doc, &mut builder)?;
        }
        if matches!(self.column, OrdinalsColumn::Multi(_)) {
            builder.mv_ordering(MvOrdering::DeduplicatedAndSortedAscending);
        }
        Ok(builder.build())
    }

    fn can_reuse(&self, starting_doc: u32) -> bool {
        self.last_doc.is_none_or(|last| last <= starting_doc)
    }
}

impl RowStrideReader for OrdinalsReader {
    fn read(
        &mut self,
        doc: u32,
        _stored: &StoredFieldLoader,
        builder: &mut BlockBuilder,
    ) -> Result<()> {
        self.rewind_if_behind(doc)?;
        self.read_doc(doc, builder)
    }

    fn can_reuse(&self, _starting_doc: u32) -> bool {
        true
    }
}

impl fmt::Display for OrdinalsReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            OrdinalsColumn::Singleton(_) => f.write_str("DocValues.SingletonOrdinals"),
            OrdinalsColumn::Multi(_) => f.write_str("DocValues.Ordinals"),
        }
    }
}
