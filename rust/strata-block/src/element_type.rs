//! Element types and multi-value ordering tags.

use std::fmt;

/// The type of the values held by a [`Block`](crate::block::Block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Boolean,
    Int,
    Long,
    Double,
    /// Variable-length byte strings.
    Bytes,
    /// Blocks where every position is null and no values are stored.
    Null,
    /// Document references (shard, segment, doc).
    Doc,
}

impl ElementType {
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Boolean => "boolean",
            ElementType::Int => "int",
            ElementType::Long => "long",
            ElementType::Double => "double",
            ElementType::Bytes => "bytes_ref",
            ElementType::Null => "null",
            ElementType::Doc => "doc",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the values of a multi-valued position are ordered.
///
/// This is a claim made by the producer of a block, not something the
/// container enforces: a block tagged `SortedAscending` was built by a
/// producer that sorted each position's values before appending them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MvOrdering {
    /// No ordering guarantee; values appear in the order they were produced.
    #[default]
    Unordered,
    /// Values within a position are sorted ascending, duplicates allowed.
    SortedAscending,
    /// Values within a position are unique and sorted ascending.
    DeduplicatedAndSortedAscending,
}

impl MvOrdering {
    /// The strongest ordering that holds for values tagged with either
    /// `self` or `other`.
    pub fn weaker(self, other: MvOrdering) -> MvOrdering {
        use MvOrdering::*;
        match (self, other) {
            (Unordered, _) | (_, Unordered) => Unordered,
            (SortedAscending, _) | (_, SortedAscending) => SortedAscending,
            (DeduplicatedAndSortedAscending, DeduplicatedAndSortedAscending) => {
                DeduplicatedAndSortedAscending
            }
        }
    }
}
