//! Doc values cursors.
//!
//! All cursors are forward-only: once positioned on a document they can only
//! move to the same or a later document. Moving backwards is an
//! `InvalidOperation` error, and callers that need to go back must open a new
//! cursor.

use strata_common::Result;

/// A numeric column with at most one value per document.
pub trait NumericDocValues: Send {
    /// Positions the cursor on `doc` and returns `true` if it has a value.
    fn advance_exact(&mut self, doc: u32) -> Result<bool>;

    /// The value of the current document. Only valid after `advance_exact`
    /// returned `true`.
    fn long_value(&self) -> i64;

    /// The document the cursor was last positioned on.
    fn doc_id(&self) -> Option<u32>;
}

/// A numeric column with any number of values per document, returned in
/// ascending order with duplicates preserved.
pub trait SortedNumericDocValues: Send {
    fn advance_exact(&mut self, doc: u32) -> Result<bool>;

    /// The number of values of the current document.
    fn doc_value_count(&self) -> usize;

    /// Returns the next value of the current document. Must be called at most
    /// `doc_value_count()` times per document.
    fn next_value(&mut self) -> i64;

    fn doc_id(&self) -> Option<u32>;
}

/// A dictionary-encoded byte-string column with at most one value per document.
pub trait SortedDocValues: Send {
    fn advance_exact(&mut self, doc: u32) -> Result<bool>;

    /// The dictionary ordinal of the current document's value.
    fn ord(&self) -> u32;

    /// Resolves a dictionary ordinal to its bytes.
    fn lookup_ord(&self, ord: u32) -> Result<&[u8]>;

    /// The size of the dictionary.
    fn value_count(&self) -> usize;

    fn doc_id(&self) -> Option<u32>;
}

/// A dictionary-encoded byte-string column with any number of values per
/// document. Ordinals are unique per document and returned in ascending order.
pub trait SortedSetDocValues: Send {
    fn advance_exact(&mut self, doc: u32) -> Result<bool>;

    fn doc_value_count(&self) -> usize;

    fn next_ord(&mut self) -> u32;

    fn lookup_ord(&self, ord: u32) -> Result<&[u8]>;

    fn value_count(&self) -> usize;

    fn doc_id(&self) -> Option<u32>;
}

/// A numeric doc values column, in its single-valued or multi-valued form.
pub enum NumericColumn {
    Singleton(Box<dyn NumericDocValues>),
    Multi(Box<dyn SortedNumericDocValues>),
}

/// A dictionary-encoded doc values column, in its single-valued or
/// multi-valued form.
pub enum OrdinalsColumn {
    Singleton(Box<dyn SortedDocValues>),
    Multi(Box<dyn SortedSetDocValues>),
}

/// Encodes a double as a long whose signed order matches the double's total
/// order.
pub fn double_to_sortable_long(value: f64) -> i64 {
    let bits = value.to_bits() as i64;
    bits ^ ((bits >> 63) & 0x7fff_ffff_ffff_ffff)
}

/// The inverse of [`double_to_sortable_long`].
pub fn sortable_long_to_double(value: i64) -> f64 {
    let bits = value ^ ((value >> 63) & 0x7fff_ffff_ffff_ffff);
    f64::from_bits(bits as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sortable_double_order() {
        let values = [f64::NEG_INFINITY, -1000.5, -1.0, -0.0, 0.0, 0.25, 3.0, f64::MAX];
        let encoded = values
            .iter()
            .map(|&v| double_to_sortable_long(v))
            .collect::<Vec<_>>();
        assert!(encoded.windows(2).all(|w| w[0] < w[1]));
        for (&v, &e) in values.iter().zip(&encoded) {
            assert_eq!(sortable_long_to_double(e).to_bits(), v.to_bits());
        }
    }
}
