//! Typed value stores.

use crate::{doc::DocVector, element_type::ElementType, offsets::Offsets};

/// The contiguous value store of a block.
///
/// Each variant owns the values of exactly one [`ElementType`]. Byte strings are
/// stored as one concatenated buffer plus `N + 1` offsets, the value at index `i`
/// occupying `data[offsets[i]..offsets[i + 1]]`.
#[derive(Debug, Clone)]
pub enum Values {
    Boolean(Vec<bool>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Double(Vec<f64>),
    Bytes { data: Vec<u8>, offsets: Offsets },
    Null,
    Doc(DocVector),
}

/// A single borrowed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Bytes(&'a [u8]),
    Doc { shard: u32, segment: u32, doc: u32 },
}

impl Value<'_> {
    pub fn element_type(&self) -> ElementType {
        match self {
            Value::Boolean(_) => ElementType::Boolean,
            Value::Int(_) => ElementType::Int,
            Value::Long(_) => ElementType::Long,
            Value::Double(_) => ElementType::Double,
            Value::Bytes(_) => ElementType::Bytes,
            Value::Doc { .. } => ElementType::Doc,
        }
    }

    /// Compares two values of the same type, ordering doubles by their total
    /// order and byte strings lexicographically.
    pub fn total_cmp(&self, other: &Value<'_>) -> std::cmp::Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (
                Value::Doc {
                    shard: s1,
                    segment: g1,
                    doc: d1,
                },
                Value::Doc {
                    shard: s2,
                    segment: g2,
                    doc: d2,
                },
            ) => (s1, g1, d1).cmp(&(s2, g2, d2)),
            (a, b) => panic!(
                "cannot compare {} with {}",
                a.element_type(),
                b.element_type()
            ),
        }
    }
}

impl Values {
    /// Creates an empty store for the given element type.
    pub fn empty(element_type: ElementType) -> Values {
        match element_type {
            ElementType::Boolean => Values::Boolean(Vec::new()),
            ElementType::Int => Values::Int(Vec::new()),
            ElementType::Long => Values::Long(Vec::new()),
            ElementType::Double => Values::Double(Vec::new()),
            ElementType::Bytes => Values::Bytes {
                data: Vec::new(),
                offsets: Offsets::new(),
            },
            ElementType::Null => Values::Null,
            ElementType::Doc => Values::Doc(DocVector::default()),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Values::Boolean(_) => ElementType::Boolean,
            Values::Int(_) => ElementType::Int,
            Values::Long(_) => ElementType::Long,
            Values::Double(_) => ElementType::Double,
            Values::Bytes { .. } => ElementType::Bytes,
            Values::Null => ElementType::Null,
            Values::Doc(_) => ElementType::Doc,
        }
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        match self {
            Values::Boolean(v) => v.len(),
            Values::Int(v) => v.len(),
            Values::Long(v) => v.len(),
            Values::Double(v) => v.len(),
            Values::Bytes { offsets, .. } => offsets.item_count(),
            Values::Null => 0,
            Values::Doc(docs) => docs.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn get(&self, index: usize) -> Value<'_> {
        match self {
            Values::Boolean(v) => Value::Boolean(v[index]),
            Values::Int(v) => Value::Int(v[index]),
            Values::Long(v) => Value::Long(v[index]),
            Values::Double(v) => Value::Double(v[index]),
            Values::Bytes { data, offsets } => Value::Bytes(&data[offsets.range_at(index)]),
            Values::Null => panic!("null store holds no values"),
            Values::Doc(docs) => Value::Doc {
                shard: docs.shard(index),
                segment: docs.segment(index),
                doc: docs.doc(index),
            },
        }
    }

    /// Appends a value.
    ///
    /// # Panics
    ///
    /// Panics if the value's type does not match the store's type.
    pub fn push(&mut self, value: Value<'_>) {
        match (self, value) {
            (Values::Boolean(v), Value::Boolean(x)) => v.push(x),
            (Values::Int(v), Value::Int(x)) => v.push(x),
            (Values::Long(v), Value::Long(x)) => v.push(x),
            (Values::Double(v), Value::Double(x)) => v.push(x),
            (Values::Bytes { data, offsets }, Value::Bytes(x)) => {
                data.extend_from_slice(x);
                offsets.push_length(x.len());
            }
            (
                Values::Doc(docs),
                Value::Doc {
                    shard,
                    segment,
                    doc,
                },
            ) => docs.push(shard, segment, doc),
            (store, value) => panic!(
                "cannot append a {} value to a {} store",
                value.element_type(),
                store.element_type()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_store() {
        let mut values = Values::empty(ElementType::Bytes);
        values.push(Value::Bytes(b"foo"));
        values.push(Value::Bytes(b""));
        values.push(Value::Bytes(b"ba"));
        assert_eq!(values.len(), 3);
        assert_eq!(values.get(0), Value::Bytes(b"foo"));
        assert_eq!(values.get(1), Value::Bytes(b""));
        assert_eq!(values.get(2), Value::Bytes(b"ba"));
    }

    #[test]
    fn test_doc_store() {
        let mut values = Values::empty(ElementType::Doc);
        values.push(Value::Doc {
            shard: 1,
            segment: 2,
            doc: 3,
        });
        assert_eq!(
            values.get(0),
            Value::Doc {
                shard: 1,
                segment: 2,
                doc: 3
            }
        );
    }

    #[test]
    #[should_panic]
    fn test_type_mismatch() {
        let mut values = Values::empty(ElementType::Long);
        values.push(Value::Int(1));
    }

    #[test]
    fn test_total_cmp() {
        use std::cmp::Ordering;
        assert_eq!(
            Value::Double(-0.5).total_cmp(&Value::Double(1.0)),
            Ordering::Less
        );
        assert_eq!(
            Value::Bytes(b"b").total_cmp(&Value::Bytes(b"ab")),
            Ordering::Greater
        );
    }
}
