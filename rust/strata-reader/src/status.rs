//! Reader telemetry.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::Serialize;

/// A snapshot of what a values reader did so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub pages_processed: usize,
    /// Usage counts keyed by `field:mode:strategy`, plus one entry per stored
    /// field loader configuration. Ordered for stable output.
    pub readers_built: BTreeMap<String, usize>,
}

impl Status {
    pub fn new(pages_processed: usize, readers_built: BTreeMap<String, usize>) -> Status {
        Status {
            pages_processed,
            readers_built,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "pages_processed": self.pages_processed,
            "readers_built": self.readers_built,
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Accumulates reader usage. Each key is counted at most once per page.
#[derive(Debug, Clone, Default)]
pub struct ReaderCounters {
    totals: BTreeMap<String, usize>,
    page: BTreeSet<String>,
}

impl ReaderCounters {
    pub fn record(&mut self, field: &str, mode: &str, strategy: impl fmt::Display) {
        self.page.insert(format!("{field}:{mode}:{strategy}"));
    }

    pub fn record_key(&mut self, key: String) {
        self.page.insert(key);
    }

    /// Folds the keys recorded for the current page into the totals.
    pub fn end_page(&mut self) {
        for key in std::mem::take(&mut self.page) {
            *self.totals.entry(key).or_default() += 1;
        }
    }

    /// Drops the keys of a page that failed.
    pub fn discard_page(&mut self) {
        self.page.clear();
    }

    pub fn totals(&self) -> &BTreeMap<String, usize> {
        &self.totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_once_per_page() {
        let mut counters = ReaderCounters::default();
        counters.record("a", "column_at_a_time", "DocValues.SingletonLongs");
        counters.record("a", "column_at_a_time", "DocValues.SingletonLongs");
        counters.record("b", "row_stride", "Source.Bytes");
        counters.end_page();
        counters.record("a", "column_at_a_time", "DocValues.SingletonLongs");
        counters.end_page();
        counters.record("c", "row_stride", "constant_nulls");
        counters.discard_page();
        counters.end_page();

        let totals = counters.totals();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals["a:column_at_a_time:DocValues.SingletonLongs"], 2);
        assert_eq!(totals["b:row_stride:Source.Bytes"], 1);
    }

    #[test]
    fn test_status_json() {
        let status = Status::new(3, BTreeMap::from([("a:row_stride:x".to_string(), 3)]));
        assert_eq!(
            status.to_string(),
            r#"{"pages_processed":3,"readers_built":{"a:row_stride:x":3}}"#
        );
    }
}
