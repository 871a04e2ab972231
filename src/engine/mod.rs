//! Collection engine.
//!
//! The collector walks the configured package×route grid across the
//! active providers and produces per-provider fetch reports.

pub mod collector;

pub use collector::{CollectionMode, RateCollector};
