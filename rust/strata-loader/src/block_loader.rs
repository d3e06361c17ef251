//! The field access strategy contract.

use std::{fmt, sync::Arc};

use strata_block::{
    block::Block,
    builder::BlockBuilder,
    element_type::{ElementType, MvOrdering},
};
use strata_common::{Result, error::Error};
use strata_segment::{segment::SegmentReader, stored::StoredFieldsSpec};

use crate::{converting::BlockConverter, stored_field_loader::StoredFieldLoader};

/// Loads the values of one field for one shard.
///
/// A loader is stateless and shared; the per-segment state lives in the
/// readers it creates. Readers are bound to exactly one segment.
pub trait BlockLoader: Send + Sync + fmt::Debug {
    /// The type of the blocks this loader produces.
    fn element_type(&self) -> ElementType;

    /// Creates a reader that loads a run of ascending doc ids at once, or
    /// `None` when this loader cannot read the field column-wise on `segment`.
    fn column_at_a_time_reader(
        &self,
        segment: &Arc<dyn SegmentReader>,
    ) -> Result<Option<Box<dyn ColumnAtATimeReader>>>;

    /// Creates a reader that loads one document at a time.
    fn row_stride_reader(&self, segment: &Arc<dyn SegmentReader>)
    -> Result<Box<dyn RowStrideReader>>;

    /// The stored fields a row-stride reader of this loader consumes.
    fn row_stride_stored_fields_spec(&self) -> StoredFieldsSpec;

    /// Returns `true` if the field is dictionary encoded and can expose its
    /// raw ordinals.
    fn supports_ordinals(&self) -> bool {
        false
    }

    /// Creates a reader producing `Int` blocks of dictionary ordinals.
    fn ordinals_reader(
        &self,
        segment: &Arc<dyn SegmentReader>,
    ) -> Result<Box<dyn ColumnAtATimeReader>> {
        let _ = segment;
        Err(Error::invalid_operation(format!(
            "{self:?} does not support ordinals"
        )))
    }

    /// The conversion that row-stride output must go through to become
    /// `element_type()`. Row-stride readers of a converting loader append the
    /// unconverted values of the wrapped loader.
    fn row_stride_conversion(&self) -> Option<&BlockConverter> {
        None
    }

    /// The type of the values row-stride readers append.
    fn row_stride_element_type(&self) -> ElementType {
        self.row_stride_conversion()
            .map_or_else(|| self.element_type(), |c| c.source_type())
    }

    /// How row-stride readers order the values of a multi-valued position.
    fn row_stride_ordering(&self) -> MvOrdering {
        MvOrdering::Unordered
    }

    /// Creates a builder for row-stride readers of this loader, tagged with
    /// [`row_stride_ordering`](BlockLoader::row_stride_ordering).
    fn row_stride_builder(&self, expected_count: usize) -> BlockBuilder {
        let mut builder =
            BlockBuilder::with_capacity(self.row_stride_element_type(), expected_count);
        builder.mv_ordering(self.row_stride_ordering());
        builder
    }

    /// Turns a block built by row-stride readers into a block of
    /// `element_type()`. Must be applied exactly once per built block.
    fn finish_row_stride(&self, block: Block) -> Result<Block> {
        match self.row_stride_conversion() {
            Some(converter) => converter.convert(&block),
            None => Ok(block),
        }
    }
}

/// Reads a field column-wise from one segment.
///
/// The `Display` form names the strategy and appears in operator status.
pub trait ColumnAtATimeReader: Send + fmt::Display {
    /// Reads the documents `docs`, which must be ascending, into a block with
    /// one position per doc.
    fn read(&mut self, docs: &[u32]) -> Result<Block>;

    /// Returns `true` if the reader can serve a read starting at
    /// `starting_doc`. Forward-only readers return `false` once they moved
    /// past it.
    fn can_reuse(&self, starting_doc: u32) -> bool;
}

/// Reads a field one document at a time from one segment.
pub trait RowStrideReader: Send + fmt::Display {
    /// Appends the values of `doc` to `builder` as exactly one position. The
    /// stored field loader has already been advanced to `doc`.
    fn read(
        &mut self,
        doc: u32,
        stored: &StoredFieldLoader,
        builder: &mut BlockBuilder,
    ) -> Result<()>;

    fn can_reuse(&self, starting_doc: u32) -> bool;
}
