//! # Strata: Field Value Loading for Search Shards
//!
//! Strata turns pages of document references into columnar blocks of field
//! values. A query pipeline hands it pages whose doc column points into the
//! segments of one or more shards; for every requested field it appends one
//! block holding that field's values for each referenced document.
//!
//! ## Key Features
//!
//! * **Strategy selection**: each field picks the cheapest way to load itself
//!   on each segment, whether column-at-a-time doc values, row-by-row
//!   stored fields or the document source
//! * **Order preservation**: output positions always follow input positions,
//!   whatever order the documents arrive in
//! * **Multi-valued fields**: blocks record how the values of a position are
//!   ordered, so consumers can skip sorting
//! * **Union types**: a field mapped with different types in different
//!   indices can be read under a single target type
//! * **Telemetry**: operators report which strategy loaded which field
//!
//! ## Module Organization
//!
//! * [`block`] - Pages, typed blocks and the doc reference column
//! * [`common`] - Error types shared across the crates
//! * [`segment`] - Segment readers: doc values, stored fields and source
//! * [`loader`] - Block loaders and their per-segment readers
//! * [`reader`] - The values reader operator, field resolution and the driver
//!
//! ### Support Modules
//!
//! * [`support::keyed_vector`] - A small vector map keyed by dense indices
//! * [`support::value_conversions`] - Conversions between value types

pub use strata_block as block;
pub use strata_common as common;
pub use strata_loader as loader;
pub use strata_reader as reader;
pub use strata_segment as segment;

pub mod support {
    pub use strata_keyed_vector as keyed_vector;
    pub use strata_value_conversions as value_conversions;
}
