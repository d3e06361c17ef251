//! The typed columnar block.

use std::{ops::Range, sync::Arc};

use crate::{
    builder::BlockBuilder,
    doc::DocVector,
    element_type::{ElementType, MvOrdering},
    offsets::Offsets,
    presence::Presence,
    values::{Value, Values},
};

/// An immutable, reference-counted column of values of one [`ElementType`]
/// over a fixed number of positions.
///
/// A block comes in two shapes:
/// - a *vector*, holding exactly one value per position: the value of position
///   `p` is stored at index `p` of the value store and there is no per-position
///   index;
/// - a multi-valued block, where `first_value_indexes` holds `N + 1` offsets and
///   position `p` owns the values `first_value_indexes[p]..first_value_indexes[p + 1]`.
///   Null positions own no values.
///
/// Cloning a block is cheap and shares the underlying storage.
#[derive(Debug, Clone)]
pub struct Block(Arc<BlockData>);

#[derive(Debug)]
struct BlockData {
    values: Values,
    first_value_indexes: Option<Offsets>,
    presence: Presence,
    mv_ordering: MvOrdering,
}

impl Block {
    pub(crate) fn from_parts(
        values: Values,
        first_value_indexes: Option<Offsets>,
        presence: Presence,
        mv_ordering: MvOrdering,
    ) -> Block {
        match &first_value_indexes {
            Some(offsets) => {
                assert_eq!(offsets.item_count(), presence.len());
                assert_eq!(offsets.last() as usize, values.len());
                debug_assert!(
                    (0..presence.len()).all(|p| !presence.is_null(p) || offsets.len_at(p) == 0)
                );
            }
            None => {
                assert!(presence.is_trivial_non_null());
                assert_eq!(values.len(), presence.len());
            }
        }
        Block(Arc::new(BlockData {
            values,
            first_value_indexes,
            presence,
            mv_ordering,
        }))
    }

    /// Creates a block of `position_count` null positions of the given type.
    pub fn constant_nulls(element_type: ElementType, position_count: usize) -> Block {
        Block::from_parts(
            Values::empty(element_type),
            Some(Offsets::zeroed(position_count)),
            Presence::Nulls(position_count),
            MvOrdering::Unordered,
        )
    }

    /// Creates a block with zero positions.
    pub fn empty(element_type: ElementType) -> Block {
        BlockBuilder::new(element_type).build()
    }

    pub fn from_longs(values: Vec<i64>) -> Block {
        Self::vector(Values::Long(values))
    }

    pub fn from_ints(values: Vec<i32>) -> Block {
        Self::vector(Values::Int(values))
    }

    pub fn from_doubles(values: Vec<f64>) -> Block {
        Self::vector(Values::Double(values))
    }

    pub fn from_booleans(values: Vec<bool>) -> Block {
        Self::vector(Values::Boolean(values))
    }

    pub fn from_bytes<T: AsRef<[u8]>>(values: impl IntoIterator<Item = T>) -> Block {
        let mut store = Values::empty(ElementType::Bytes);
        for value in values {
            store.push(Value::Bytes(value.as_ref()));
        }
        Self::vector(store)
    }

    pub fn from_docs(docs: DocVector) -> Block {
        Self::vector(Values::Doc(docs))
    }

    fn vector(values: Values) -> Block {
        let len = values.len();
        Block::from_parts(values, None, Presence::Trivial(len), MvOrdering::Unordered)
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.0.values.element_type()
    }

    #[inline]
    pub fn position_count(&self) -> usize {
        self.0.presence.len()
    }

    /// Returns the number of values across all positions.
    #[inline]
    pub fn total_value_count(&self) -> usize {
        self.0.values.len()
    }

    #[inline]
    pub fn is_null(&self, position: usize) -> bool {
        self.0.presence.is_null(position)
    }

    /// Returns the number of values held by `position`; zero for nulls.
    #[inline]
    pub fn value_count(&self, position: usize) -> usize {
        match &self.0.first_value_indexes {
            Some(offsets) => offsets.len_at(position),
            None => {
                assert!(position < self.position_count());
                1
            }
        }
    }

    /// Returns the index of the first value of `position` in the value store.
    #[inline]
    pub fn first_value_index(&self, position: usize) -> usize {
        match &self.0.first_value_indexes {
            Some(offsets) => offsets[position] as usize,
            None => position,
        }
    }

    /// Returns the value store range owned by `position`.
    #[inline]
    pub fn value_range(&self, position: usize) -> Range<usize> {
        match &self.0.first_value_indexes {
            Some(offsets) => offsets.range_at(position),
            None => position..position + 1,
        }
    }

    /// Returns `true` if every position is null.
    pub fn are_all_values_null(&self) -> bool {
        self.element_type() == ElementType::Null
            || self.0.presence.is_trivial_all_null()
            || (self.position_count() > 0
                && self.0.presence.count_nulls() == self.position_count())
    }

    /// Returns `true` if the block may contain null positions.
    #[inline]
    pub fn may_have_nulls(&self) -> bool {
        !self.0.presence.is_trivial_non_null()
    }

    /// Returns `true` if some position holds more than one value.
    pub fn may_have_multivalues(&self) -> bool {
        match &self.0.first_value_indexes {
            Some(offsets) => offsets.ranges().any(|r| r.len() > 1),
            None => false,
        }
    }

    /// Returns `true` for the single-valued, null-free representation.
    #[inline]
    pub fn is_vector(&self) -> bool {
        self.0.first_value_indexes.is_none()
    }

    #[inline]
    pub fn mv_ordering(&self) -> MvOrdering {
        self.0.mv_ordering
    }

    #[inline]
    pub fn values(&self) -> &Values {
        &self.0.values
    }

    #[inline]
    pub fn presence(&self) -> &Presence {
        &self.0.presence
    }

    /// Returns the value at `value_index` in the value store.
    #[inline]
    pub fn value(&self, value_index: usize) -> Value<'_> {
        self.0.values.get(value_index)
    }

    /// Iterates over the values of `position`, in stored order.
    pub fn position_values(&self, position: usize) -> impl Iterator<Item = Value<'_>> + '_ {
        self.value_range(position).map(|i| self.value(i))
    }

    pub fn get_boolean(&self, value_index: usize) -> bool {
        match &self.0.values {
            Values::Boolean(v) => v[value_index],
            other => panic!("expected a boolean block, got {}", other.element_type()),
        }
    }

    pub fn get_int(&self, value_index: usize) -> i32 {
        match &self.0.values {
            Values::Int(v) => v[value_index],
            other => panic!("expected an int block, got {}", other.element_type()),
        }
    }

    pub fn get_long(&self, value_index: usize) -> i64 {
        match &self.0.values {
            Values::Long(v) => v[value_index],
            other => panic!("expected a long block, got {}", other.element_type()),
        }
    }

    pub fn get_double(&self, value_index: usize) -> f64 {
        match &self.0.values {
            Values::Double(v) => v[value_index],
            other => panic!("expected a double block, got {}", other.element_type()),
        }
    }

    pub fn get_bytes(&self, value_index: usize) -> &[u8] {
        match &self.0.values {
            Values::Bytes { data, offsets } => &data[offsets.range_at(value_index)],
            other => panic!("expected a bytes block, got {}", other.element_type()),
        }
    }

    /// Returns the document references if this is a doc block.
    pub fn as_doc_vector(&self) -> Option<&DocVector> {
        match &self.0.values {
            Values::Doc(docs) => Some(docs),
            _ => None,
        }
    }

    /// Builds a block of the selected positions, in selection order. Positions
    /// may repeat. The ordering tag is preserved.
    pub fn filter(&self, positions: &[usize]) -> Block {
        if let Some(docs) = self.as_doc_vector() {
            return Block::from_docs(docs.filter(positions));
        }
        if self.element_type() == ElementType::Null || self.0.presence.is_trivial_all_null() {
            assert!(positions.iter().all(|&p| p < self.position_count()));
            return Block::constant_nulls(self.element_type(), positions.len());
        }
        let mut builder = BlockBuilder::with_capacity(self.element_type(), positions.len());
        for &p in positions {
            builder.copy_position(self, p);
        }
        builder.mv_ordering(self.mv_ordering()).build()
    }

    /// Concatenates the positions of `pieces`, in order.
    ///
    /// `Null`-typed pieces contribute null positions to a typed result. The
    /// ordering tag is the weakest tag among the multi-valued pieces.
    ///
    /// # Panics
    ///
    /// Panics if `pieces` is empty or holds two different non-null types.
    pub fn concat(pieces: &[Block]) -> Block {
        assert!(!pieces.is_empty(), "nothing to concatenate");
        if pieces.len() == 1 {
            return pieces[0].clone();
        }
        let element_type = pieces
            .iter()
            .map(Block::element_type)
            .find(|t| *t != ElementType::Null)
            .unwrap_or(ElementType::Null);

        let multi_valued = pieces
            .iter()
            .filter(|p| p.may_have_multivalues())
            .collect::<Vec<_>>();
        let candidates = if multi_valued.is_empty() {
            pieces.iter().collect::<Vec<_>>()
        } else {
            multi_valued
        };
        let mv_ordering = candidates
            .iter()
            .map(|p| p.mv_ordering())
            .reduce(MvOrdering::weaker)
            .unwrap_or_default();

        let position_count = pieces.iter().map(Block::position_count).sum();
        let mut builder = BlockBuilder::with_capacity(element_type, position_count);
        for piece in pieces {
            builder.copy_from(piece, 0..piece.position_count());
        }
        builder.mv_ordering(mv_ordering).build()
    }
}

impl PartialEq for Block {
    /// Value equality: same position count, the same null positions and the
    /// same values per position. A `Null`-typed block equals any all-null block
    /// of the same size.
    fn eq(&self, other: &Self) -> bool {
        if self.position_count() != other.position_count() {
            return false;
        }
        if self.element_type() != other.element_type() {
            let null_typed = self.element_type() == ElementType::Null
                || other.element_type() == ElementType::Null;
            return null_typed && self.are_all_values_null() && other.are_all_values_null();
        }
        (0..self.position_count()).all(|p| {
            self.is_null(p) == other.is_null(p)
                && self.value_count(p) == other.value_count(p)
                && self
                    .position_values(p)
                    .zip(other.position_values(p))
                    .all(|(a, b)| a.total_cmp(&b).is_eq())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv_longs(positions: &[Option<&[i64]>], ordering: MvOrdering) -> Block {
        let mut builder = BlockBuilder::new(ElementType::Long);
        for position in positions {
            match position {
                None => builder.append_null(),
                Some(values) => {
                    builder.begin_position_entry();
                    for &v in *values {
                        builder.append_long(v);
                    }
                    builder.end_position_entry();
                }
            }
        }
        builder.mv_ordering(ordering).build()
    }

    #[test]
    fn test_vector() {
        let block = Block::from_longs(vec![1, 2, 3]);
        assert!(block.is_vector());
        assert!(!block.may_have_nulls());
        assert!(!block.may_have_multivalues());
        assert_eq!(block.position_count(), 3);
        assert_eq!(block.value_count(1), 1);
        assert_eq!(block.get_long(block.first_value_index(2)), 3);
    }

    #[test]
    fn test_constant_nulls() {
        let block = Block::constant_nulls(ElementType::Bytes, 4);
        assert_eq!(block.element_type(), ElementType::Bytes);
        assert!(block.are_all_values_null());
        assert!((0..4).all(|p| block.is_null(p) && block.value_count(p) == 0));
        assert_eq!(block, Block::constant_nulls(ElementType::Null, 4));
        assert_ne!(block, Block::constant_nulls(ElementType::Null, 3));
        assert_ne!(block, Block::from_bytes(["a", "b", "c", "d"]));
    }

    #[test]
    fn test_multivalued() {
        let block = mv_longs(
            &[Some(&[1, 2]), None, Some(&[3]), Some(&[4, 4, 5])],
            MvOrdering::SortedAscending,
        );
        assert!(!block.is_vector());
        assert!(block.may_have_nulls());
        assert!(block.may_have_multivalues());
        assert_eq!(block.total_value_count(), 6);
        assert_eq!(block.value_count(0), 2);
        assert_eq!(block.value_count(1), 0);
        assert!(block.is_null(1));
        assert_eq!(block.first_value_index(3), 3);
        assert_eq!(
            block.position_values(3).collect::<Vec<_>>(),
            vec![Value::Long(4), Value::Long(4), Value::Long(5)]
        );
        assert_eq!(block.mv_ordering(), MvOrdering::SortedAscending);
    }

    #[test]
    fn test_filter() {
        let block = mv_longs(
            &[Some(&[1, 2]), None, Some(&[3])],
            MvOrdering::SortedAscending,
        );
        let filtered = block.filter(&[2, 0, 1, 0]);
        let expected = mv_longs(
            &[Some(&[3]), Some(&[1, 2]), None, Some(&[1, 2])],
            MvOrdering::SortedAscending,
        );
        assert_eq!(filtered, expected);
        assert_eq!(filtered.mv_ordering(), MvOrdering::SortedAscending);

        let empty = block.filter(&[]);
        assert_eq!(empty.position_count(), 0);
        assert_eq!(empty.element_type(), ElementType::Long);
    }

    #[test]
    fn test_filter_docs() {
        let block = Block::from_docs(DocVector::single_segment(0, 0, vec![5, 6, 7]));
        let filtered = block.filter(&[2, 0]);
        assert_eq!(filtered.as_doc_vector().unwrap().docs(), &[7, 5]);
    }

    #[test]
    fn test_concat() {
        let a = mv_longs(&[Some(&[1, 2])], MvOrdering::SortedAscending);
        let b = Block::constant_nulls(ElementType::Null, 2);
        let c = Block::from_longs(vec![7]);
        let block = Block::concat(&[a.clone(), b, c]);
        assert_eq!(block.element_type(), ElementType::Long);
        assert_eq!(block.position_count(), 4);
        assert_eq!(block.mv_ordering(), MvOrdering::SortedAscending);
        assert!(block.is_null(1) && block.is_null(2));
        assert_eq!(block.get_long(block.first_value_index(3)), 7);

        let e = mv_longs(&[Some(&[4, 5])], MvOrdering::DeduplicatedAndSortedAscending);
        assert_eq!(
            Block::concat(&[e.clone(), a.clone()]).mv_ordering(),
            MvOrdering::SortedAscending
        );
        assert_eq!(
            Block::concat(&[e.clone(), e.clone()]).mv_ordering(),
            MvOrdering::DeduplicatedAndSortedAscending
        );

        let d = mv_longs(&[Some(&[3, 1])], MvOrdering::Unordered);
        assert_eq!(Block::concat(&[e, a, d]).mv_ordering(), MvOrdering::Unordered);
    }

    #[test]
    fn test_concat_single_piece_shares_storage() {
        let a = Block::from_ints(vec![1, 2]);
        assert!(Arc::ptr_eq(&Block::concat(std::slice::from_ref(&a)).0, &a.0));
    }

    #[test]
    fn test_equality_is_by_value() {
        let a = mv_longs(&[Some(&[1]), Some(&[2]), None], MvOrdering::Unordered);
        assert!(!a.is_vector());
        let b = Block::concat(&[
            Block::from_longs(vec![1, 2]),
            Block::constant_nulls(ElementType::Null, 1),
        ]);
        assert_eq!(a, b);
        assert_ne!(Block::from_longs(vec![1, 2]), Block::from_ints(vec![1, 2]));
    }

    #[test]
    #[should_panic]
    fn test_wrong_getter() {
        Block::from_ints(vec![1]).get_long(0);
    }
}
