//! The document reference column.

use std::{ops::Range, sync::OnceLock};

/// A contiguous run of positions referencing one segment of one shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRun {
    pub shard: u32,
    pub segment: u32,
    /// Positions of the run within the vector.
    pub start: usize,
    pub end: usize,
}

impl SegmentRun {
    #[inline]
    pub fn positions(&self) -> Range<usize> {
        self.start..self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// References to documents as three parallel columns: shard index, segment
/// ordinal within the shard and document id within the segment.
///
/// The ordering queries are computed on first use and cached; mutating the
/// vector resets them.
#[derive(Debug, Clone, Default)]
pub struct DocVector {
    shards: Vec<u32>,
    segments: Vec<u32>,
    docs: Vec<u32>,
    segment_runs: OnceLock<Option<Vec<SegmentRun>>>,
    forwards: OnceLock<Vec<usize>>,
    backwards: OnceLock<Vec<usize>>,
}

impl DocVector {
    /// # Panics
    ///
    /// Panics if the three columns have different lengths.
    pub fn new(shards: Vec<u32>, segments: Vec<u32>, docs: Vec<u32>) -> DocVector {
        assert_eq!(shards.len(), segments.len());
        assert_eq!(shards.len(), docs.len());
        DocVector {
            shards,
            segments,
            docs,
            ..Default::default()
        }
    }

    /// References `docs` within a single segment.
    pub fn single_segment(shard: u32, segment: u32, docs: Vec<u32>) -> DocVector {
        let len = docs.len();
        DocVector::new(vec![shard; len], vec![segment; len], docs)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[inline]
    pub fn shard(&self, position: usize) -> u32 {
        self.shards[position]
    }

    #[inline]
    pub fn segment(&self, position: usize) -> u32 {
        self.segments[position]
    }

    #[inline]
    pub fn doc(&self, position: usize) -> u32 {
        self.docs[position]
    }

    pub fn shards(&self) -> &[u32] {
        &self.shards
    }

    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    pub fn docs(&self) -> &[u32] {
        &self.docs
    }

    pub fn push(&mut self, shard: u32, segment: u32, doc: u32) {
        self.shards.push(shard);
        self.segments.push(segment);
        self.docs.push(doc);
        self.reset_caches();
    }

    /// Splits the vector into maximal runs of positions that share a
    /// (shard, segment) pair.
    ///
    /// Returns `None` when the doc ids decrease anywhere inside a run, in which
    /// case the vector must be read in a random-access fashion.
    pub fn segment_runs(&self) -> Option<&[SegmentRun]> {
        self.segment_runs
            .get_or_init(|| self.compute_segment_runs())
            .as_deref()
    }

    /// The permutation that sorts positions by (shard, segment, doc): the
    /// `i`-th sorted reference is at position `forwards[i]`. Stable for equal
    /// references.
    pub fn shard_segment_doc_map_forwards(&self) -> &[usize] {
        self.forwards.get_or_init(|| {
            let mut map = (0..self.len()).collect::<Vec<_>>();
            map.sort_by_key(|&p| (self.shards[p], self.segments[p], self.docs[p]));
            map
        })
    }

    /// The inverse of [`Self::shard_segment_doc_map_forwards`]: position `p`
    /// holds the `backwards[p]`-th sorted reference.
    pub fn shard_segment_doc_map_backwards(&self) -> &[usize] {
        self.backwards.get_or_init(|| {
            let forwards = self.shard_segment_doc_map_forwards();
            let mut map = vec![0; forwards.len()];
            for (sorted, &position) in forwards.iter().enumerate() {
                map[position] = sorted;
            }
            map
        })
    }

    /// Builds a vector of the selected positions, in selection order.
    pub fn filter(&self, positions: &[usize]) -> DocVector {
        DocVector::new(
            positions.iter().map(|&p| self.shards[p]).collect(),
            positions.iter().map(|&p| self.segments[p]).collect(),
            positions.iter().map(|&p| self.docs[p]).collect(),
        )
    }

    fn compute_segment_runs(&self) -> Option<Vec<SegmentRun>> {
        let mut runs: Vec<SegmentRun> = Vec::new();
        for p in 0..self.len() {
            match runs.last_mut() {
                Some(run) if run.shard == self.shards[p] && run.segment == self.segments[p] => {
                    if self.docs[p] < self.docs[p - 1] {
                        return None;
                    }
                    run.end = p + 1;
                }
                _ => runs.push(SegmentRun {
                    shard: self.shards[p],
                    segment: self.segments[p],
                    start: p,
                    end: p + 1,
                }),
            }
        }
        Some(runs)
    }

    fn reset_caches(&mut self) {
        self.segment_runs.take();
        self.forwards.take();
        self.backwards.take();
    }
}

impl PartialEq for DocVector {
    fn eq(&self, other: &Self) -> bool {
        self.shards == other.shards && self.segments == other.segments && self.docs == other.docs
    }
}
