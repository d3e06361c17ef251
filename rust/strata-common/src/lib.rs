//! Core definitions (error type and result helpers), relied upon by all strata-* crates.

pub mod error;
pub mod macros;
pub mod result;

pub use result::Result;
