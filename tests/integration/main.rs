//! Integration tests: full collect→store→serve pipeline with a
//! deterministic mock provider.

mod mock_provider;
mod pipeline;
