//! Incremental construction of blocks.

use std::ops::Range;

use crate::{
    block::Block,
    element_type::{ElementType, MvOrdering},
    offsets::Offsets,
    presence::Presence,
    values::{Value, Values},
};

/// Builds a [`Block`] one position at a time.
///
/// A position is either null (`append_null`), a single value (one of the
/// `append_*` calls outside of an entry), or a multi-valued entry opened with
/// [`begin_position_entry`](Self::begin_position_entry) and closed with
/// [`end_position_entry`](Self::end_position_entry). An entry that receives no
/// values becomes a null position.
///
/// Appending a value of the wrong type is a programming error and panics.
#[derive(Debug)]
pub struct BlockBuilder {
    values: Values,
    first_value_indexes: Offsets,
    presence: Presence,
    entry_start: Option<usize>,
    has_multivalues: bool,
    mv_ordering: MvOrdering,
}

impl BlockBuilder {
    pub fn new(element_type: ElementType) -> BlockBuilder {
        Self::with_capacity(element_type, 0)
    }

    pub fn with_capacity(element_type: ElementType, positions: usize) -> BlockBuilder {
        BlockBuilder {
            values: Values::empty(element_type),
            first_value_indexes: Offsets::with_capacity(positions),
            presence: Presence::default(),
            entry_start: None,
            has_multivalues: false,
            mv_ordering: MvOrdering::Unordered,
        }
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.values.element_type()
    }

    /// Returns the number of completed positions.
    #[inline]
    pub fn position_count(&self) -> usize {
        self.presence.len()
    }

    pub fn append_null(&mut self) {
        assert!(
            self.entry_start.is_none(),
            "cannot append a null inside a position entry"
        );
        self.presence.push_null();
        self.first_value_indexes.push_offset(self.values.len());
    }

    pub fn append_nulls(&mut self, count: usize) {
        for _ in 0..count {
            self.append_null();
        }
    }

    /// Opens a multi-valued position.
    pub fn begin_position_entry(&mut self) {
        assert!(self.entry_start.is_none(), "position entry already open");
        self.entry_start = Some(self.values.len());
    }

    /// Closes the open position; no values make it a null position.
    pub fn end_position_entry(&mut self) {
        let start = self
            .entry_start
            .take()
            .unwrap_or_else(|| panic!("no open position entry"));
        let count = self.values.len() - start;
        if count == 0 {
            self.presence.push_null();
        } else {
            self.presence.push_non_null();
            self.has_multivalues |= count > 1;
        }
        self.first_value_indexes.push_offset(self.values.len());
    }

    pub fn append_boolean(&mut self, value: bool) {
        self.append_value(Value::Boolean(value));
    }

    pub fn append_int(&mut self, value: i32) {
        self.append_value(Value::Int(value));
    }

    pub fn append_long(&mut self, value: i64) {
        self.append_value(Value::Long(value));
    }

    pub fn append_double(&mut self, value: f64) {
        self.append_value(Value::Double(value));
    }

    pub fn append_bytes(&mut self, value: &[u8]) {
        self.append_value(Value::Bytes(value));
    }

    /// Appends a value, either to the open entry or as a complete position.
    pub fn append_value(&mut self, value: Value<'_>) {
        self.values.push(value);
        if self.entry_start.is_none() {
            self.presence.push_non_null();
            self.first_value_indexes.push_offset(self.values.len());
        }
    }

    /// Copies the positions in `range` of `block`, keeping their multiplicity
    /// and nulls. A `Null`-typed source contributes null positions.
    pub fn copy_from(&mut self, block: &Block, range: Range<usize>) {
        for position in range {
            self.copy_position(block, position);
        }
    }

    pub(crate) fn copy_position(&mut self, block: &Block, position: usize) {
        if block.is_null(position) {
            self.append_null();
            return;
        }
        assert_eq!(block.element_type(), self.element_type());
        let range = block.value_range(position);
        if range.len() == 1 {
            self.append_value(block.value(range.start));
        } else {
            self.begin_position_entry();
            for i in range {
                self.append_value(block.value(i));
            }
            self.end_position_entry();
        }
    }

    /// Declares how the values of each multi-valued position were ordered by
    /// the producer.
    pub fn mv_ordering(&mut self, mv_ordering: MvOrdering) -> &mut Self {
        self.mv_ordering = mv_ordering;
        self
    }

    /// Builds the block, choosing the vector representation when every
    /// position holds exactly one value. Resets the builder.
    pub fn build(&mut self) -> Block {
        assert!(self.entry_start.is_none(), "unterminated position entry");
        let element_type = self.element_type();
        let values = std::mem::replace(&mut self.values, Values::empty(element_type));
        let offsets = std::mem::take(&mut self.first_value_indexes);
        let presence = std::mem::take(&mut self.presence);
        let is_vector = presence.is_trivial_non_null() && !self.has_multivalues;
        self.has_multivalues = false;
        let mv_ordering = std::mem::take(&mut self.mv_ordering);
        Block::from_parts(
            values,
            (!is_vector).then_some(offsets),
            presence,
            mv_ordering,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_values_build_a_vector() {
        let mut builder = BlockBuilder::new(ElementType::Double);
        builder.append_double(1.5);
        builder.begin_position_entry();
        builder.append_double(2.5);
        builder.end_position_entry();
        let block = builder.build();
        assert!(block.is_vector());
        assert_eq!(block.get_double(1), 2.5);
    }

    #[test]
    fn test_empty_entry_is_null() {
        let mut builder = BlockBuilder::new(ElementType::Bytes);
        builder.begin_position_entry();
        builder.end_position_entry();
        builder.append_bytes(b"x");
        let block = builder.build();
        assert_eq!(block.position_count(), 2);
        assert!(block.is_null(0));
        assert_eq!(block.get_bytes(block.first_value_index(1)), b"x");
    }

    #[test]
    fn test_all_nulls() {
        let mut builder = BlockBuilder::new(ElementType::Int);
        builder.append_nulls(3);
        let block = builder.build();
        assert!(block.are_all_values_null());
        assert_eq!(block, Block::constant_nulls(ElementType::Int, 3));
    }

    #[test]
    fn test_null_typed_builder() {
        let mut builder = BlockBuilder::new(ElementType::Null);
        builder.copy_from(&Block::constant_nulls(ElementType::Long, 2), 0..2);
        let block = builder.build();
        assert_eq!(block.element_type(), ElementType::Null);
        assert!(block.are_all_values_null());
    }

    #[test]
    fn test_build_resets() {
        let mut builder = BlockBuilder::new(ElementType::Long);
        builder.mv_ordering(MvOrdering::SortedAscending);
        builder.begin_position_entry();
        builder.append_long(1);
        builder.append_long(2);
        builder.end_position_entry();
        let first = builder.build();
        assert_eq!(first.mv_ordering(), MvOrdering::SortedAscending);
        builder.append_long(3);
        let second = builder.build();
        assert!(second.is_vector());
        assert_eq!(second.mv_ordering(), MvOrdering::Unordered);
    }

    #[test]
    #[should_panic]
    fn test_type_mismatch_panics() {
        let mut builder = BlockBuilder::new(ElementType::Long);
        builder.append_int(1);
    }

    #[test]
    #[should_panic]
    fn test_unterminated_entry_panics() {
        let mut builder = BlockBuilder::new(ElementType::Long);
        builder.begin_position_entry();
        builder.build();
    }
}
