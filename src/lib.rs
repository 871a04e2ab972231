//! RATEWATCH — Shipping Rate Monitor
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod providers;
pub mod engine;
pub mod storage;
pub mod dashboard;
