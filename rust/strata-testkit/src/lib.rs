//! Test utilities for the strata crates.
//!
//! This crate provides:
//! - A deterministic two-index corpus cut into segments, with the values every
//!   field is expected to load
//! - Page helpers: natural-order doc pages, merging, shuffling and random
//!   page sizes
//! - Conversion of block positions to JSON for comparisons
//!
//! # Usage
//!
//! This crate is intended for the test suites of the workspace only.

pub mod block_json;
pub mod corpus;
pub mod pages;
