//! Field access strategies.
//!
//! A [`block_loader::BlockLoader`] describes how to read one field and hands out
//! per-segment readers:
//!
//! - a [`block_loader::ColumnAtATimeReader`] reads a whole run of ascending doc
//!   ids into one block;
//! - a [`block_loader::RowStrideReader`] appends one document at a time into a
//!   caller-owned builder, using the document's stored fields and source as
//!   loaded by a shared [`stored_field_loader::StoredFieldLoader`].
//!
//! Every concrete loader commits to one source of values: constants, doc
//! values, stored fields or the document source. [`converting`] wraps any of
//! them to coerce its output type, and [`mapping`] picks a loader for a mapped
//! field.

pub mod block_loader;
pub mod constant;
pub mod converting;
pub mod doc_values;
pub mod mapping;
pub mod source;
pub mod stored_field_loader;
pub mod stored_fields;
