//! The values reader operator and the minimal operator framework it runs in.
//!
//! [`values_reader::ValuesReaderOperator`] takes pages carrying a doc
//! reference column and appends one block per requested field. Per batch it
//! picks the cheapest access path the batch shape allows, keeps the
//! per-segment readers of each field across batches, and reports which
//! strategies it used in its [`status::Status`].

pub mod config;
pub mod driver;
pub mod field;
pub mod field_resolution;
pub mod operator;
pub mod status;
pub mod values_reader;

#[cfg(test)]
mod tests;
