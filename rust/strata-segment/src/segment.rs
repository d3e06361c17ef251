//! Segment and shard readers.

use std::{fmt, sync::Arc};

use strata_common::{Result, error::Error};

use crate::{
    doc_values::{NumericColumn, OrdinalsColumn},
    stored::StoredFieldsReader,
};

/// Read access to one immutable segment of a shard.
///
/// Every call opens fresh cursors; the returned readers own their position
/// state and are not shared.
pub trait SegmentReader: Send + Sync + fmt::Debug {
    /// The ordinal of this segment within its shard.
    fn ordinal(&self) -> u32;

    /// The number of documents in the segment; doc ids are `0..max_doc`.
    fn max_doc(&self) -> u32;

    /// Opens the numeric doc values of `field`, or `None` when the segment has
    /// no such column.
    fn numeric_doc_values(&self, field: &str) -> Result<Option<NumericColumn>>;

    /// Opens the dictionary-encoded doc values of `field`, or `None` when the
    /// segment has no such column.
    fn ordinal_doc_values(&self, field: &str) -> Result<Option<OrdinalsColumn>>;

    /// Opens a reader over the stored fields of the segment.
    fn stored_fields(&self) -> Result<Box<dyn StoredFieldsReader>>;
}

/// The segments of one shard, indexed by ordinal.
#[derive(Clone, Default)]
pub struct ShardReader {
    segments: Vec<Arc<dyn SegmentReader>>,
}

impl ShardReader {
    /// # Panics
    ///
    /// Panics if the segment ordinals are not `0..segments.len()` in order.
    pub fn new(segments: Vec<Arc<dyn SegmentReader>>) -> ShardReader {
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.ordinal() as usize, i, "segments out of order");
        }
        ShardReader { segments }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[Arc<dyn SegmentReader>] {
        &self.segments
    }

    /// Returns the segment with the given ordinal. A reference to a segment the
    /// shard does not have is a decode fault.
    pub fn segment(&self, ordinal: u32) -> Result<&Arc<dyn SegmentReader>> {
        self.segments.get(ordinal as usize).ok_or_else(|| {
            Error::invalid_format_msg(
                "segment",
                format!(
                    "segment ordinal {ordinal} out of range [0..{})",
                    self.segments.len()
                ),
            )
        })
    }

    /// The total number of documents across all segments.
    pub fn doc_count(&self) -> u64 {
        self.segments.iter().map(|s| s.max_doc() as u64).sum()
    }
}

impl fmt::Debug for ShardReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardReader")
            .field("segments", &self.segments.len())
            .field("docs", &self.doc_count())
            .finish()
    }
}
