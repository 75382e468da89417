//! Integration tests for the reform/simulation/metrics pipeline.
//!
//! Tests are organized by topic:
//! - `reform` - building reforms from flat parameter mappings
//! - `cache` - key derivation and the get/put contract
//! - `household` - situations, perturbation probes, household metrics
//! - `pipeline` - population comparisons end to end, registry dispatch

mod cache;
mod household;
mod pipeline;
