//! Dataset generator and benchmark utilities for reconcile.
//!
//! This crate provides deterministic generation of record sets with a known
//! number of injected discrepancies, for benchmarking and property-based
//! testing of `reconcile-core`.

pub mod generator;

pub use generator::{Dataset, GeneratorConfig, SizeTier, generate_dataset, generate_words};
