//! Loaders that ignore the document: constant values and constant nulls.

use std::{fmt, sync::Arc};

use itertools::Itertools;
use strata_block::{block::Block, builder::BlockBuilder, element_type::ElementType};
use strata_common::Result;
use strata_segment::{segment::SegmentReader, stored::StoredFieldsSpec};

use crate::{
    block_loader::{BlockLoader, ColumnAtATimeReader, RowStrideReader},
    stored_field_loader::StoredFieldLoader,
};

/// Loads null for every document. Used for fields that do not exist in a
/// shard's mapping or segment.
#[derive(Debug, Clone)]
pub struct ConstantNullsLoader {
    element_type: ElementType,
}

impl ConstantNullsLoader {
    pub fn new(element_type: ElementType) -> ConstantNullsLoader {
        ConstantNullsLoader { element_type }
    }
}

impl BlockLoader for ConstantNullsLoader {
    fn element_type(&self) -> ElementType {
        self.element_type
    }

    fn column_at_a_time_reader(
        &self,
        _segment: &Arc<dyn SegmentReader>,
    ) -> Result<Option<Box<dyn ColumnAtATimeReader>>> {
        Ok(Some(Box::new(ConstantNullsReader::new(self.element_type))))
    }

    fn row_stride_reader(
        &self,
        _segment: &Arc<dyn SegmentReader>,
    ) -> Result<Box<dyn RowStrideReader>> {
        Ok(Box::new(ConstantNullsReader::new(self.element_type)))
    }

    fn row_stride_stored_fields_spec(&self) -> StoredFieldsSpec {
        StoredFieldsSpec::NO_REQUIREMENTS
    }
}

/// Reads null for every document.
#[derive(Debug, Clone)]
pub struct ConstantNullsReader {
    element_type: ElementType,
}

impl ConstantNullsReader {
    pub fn new(element_type: ElementType) -> ConstantNullsReader {
        ConstantNullsReader { element_type }
    }
}

impl ColumnAtATimeReader for ConstantNullsReader {
    fn read(&mut self, docs: &[u32]) -> Result<Block> {
        Ok(Block::constant_nulls(self.element_type, docs.len()))
    }

    fn can_reuse(&self, _starting_doc: u32) -> bool {
        true
    }
}

impl RowStrideReader for ConstantNullsReader {
    fn read(
        &mut self,
        _doc: u32,
        _stored: &StoredFieldLoader,
        builder: &mut BlockBuilder,
    ) -> Result<()> {
        builder.append_null();
        Ok(())
    }

    fn can_reuse(&self, _starting_doc: u32) -> bool {
        true
    }
}

impl fmt::Display for ConstantNullsReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("constant_nulls")
    }
}

/// Loads the same byte string for every document.
#[derive(Debug, Clone)]
pub struct ConstantBytesLoader {
    value: Arc<[u8]>,
}

impl ConstantBytesLoader {
    pub fn new(value: impl AsRef<[u8]>) -> ConstantBytesLoader {
        ConstantBytesLoader {
            value: Arc::from(value.as_ref()),
        }
    }

    fn reader(&self) -> ConstantBytesReader {
        ConstantBytesReader {
            value: self.value.clone(),
        }
    }
}

impl BlockLoader for ConstantBytesLoader {
    fn element_type(&self) -> ElementType {
        ElementType::Bytes
    }

    fn column_at_a_time_reader(
        &self,
        _segment: &Arc<dyn SegmentReader>,
    ) -> Result<Option<Box<dyn ColumnAtATimeReader>>> {
        Ok(Some(Box::new(self.reader())))
    }

    fn row_stride_reader(
        &self,
        _segment: &Arc<dyn SegmentReader>,
    ) -> Result<Box<dyn RowStrideReader>> {
        Ok(Box::new(self.reader()))
    }

    fn row_stride_stored_fields_spec(&self) -> StoredFieldsSpec {
        StoredFieldsSpec::NO_REQUIREMENTS
    }
}

#[derive(Debug, Clone)]
pub struct ConstantBytesReader {
    value: Arc<[u8]>,
}

impl ColumnAtATimeReader for ConstantBytesReader {
    fn read(&mut self, docs: &[u32]) -> Result<Block> {
        Ok(Block::from_bytes(std::iter::repeat_n(&*self.value, docs.len())))
    }

    fn can_reuse(&self, _starting_doc: u32) -> bool {
        true
    }
}

impl RowStrideReader for ConstantBytesReader {
    fn read(
        &mut self,
        _doc: u32,
        _stored: &StoredFieldLoader,
        builder: &mut BlockBuilder,
    ) -> Result<()> {
        builder.append_bytes(&self.value);
        Ok(())
    }

    fn can_reuse(&self, _starting_doc: u32) -> bool {
        true
    }
}

impl fmt::Display for ConstantBytesReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "constant[[{}]]",
            self.value.iter().map(|b| format!("{b:02x}")).join(" ")
        )
    }
}
