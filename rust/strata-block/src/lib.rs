//! Typed columnar blocks: the unit of data exchanged between query operators.
//!
//! # Core Concepts
//!
//! ## Blocks
//!
//! A [`block::Block`] is an immutable, reference-counted column of values of one
//! [`element_type::ElementType`] over a fixed number of positions. A position
//! is null, holds a single value or holds several values. Blocks where every
//! position holds exactly one value use the compact *vector* representation.
//!
//! Multi-valued blocks carry an [`element_type::MvOrdering`] tag describing how
//! the producer ordered the values of each position.
//!
//! ## Pages
//!
//! A [`page::Page`] is a batch of blocks sharing one position count. Document
//! references travel in a [`doc::DocVector`] block alongside the field columns.
//!
//! # Main Components
//!
//! - [`values::Values`]: the typed value store
//! - [`offsets::Offsets`]: `N + 1` offsets delimiting byte strings and positions
//! - [`presence::Presence`]: null tracking with trivial, all-null and byte modes
//! - [`builder::BlockBuilder`]: position-at-a-time construction

pub mod block;
pub mod builder;
pub mod doc;
pub mod element_type;
pub mod offsets;
pub mod page;
pub mod presence;
pub mod values;
