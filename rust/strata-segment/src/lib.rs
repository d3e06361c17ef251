//! The storage-side contract consumed by field loaders.
//!
//! A shard is a list of immutable segments. Each [`segment::SegmentReader`]
//! exposes three ways of reaching a field's values:
//!
//! - doc values: per-document, pre-sorted columns read through forward-only
//!   cursors ([`doc_values`]);
//! - stored fields: a compact per-document record ([`stored`]);
//! - the source: the original JSON document body, usually kept as a stored
//!   field and decoded on demand ([`source`]).
//!
//! [`memory::MemorySegment`] is an in-memory implementation built with
//! [`memory::SegmentBuilder`].

pub mod doc_values;
pub mod memory;
pub mod segment;
pub mod source;
pub mod stored;
