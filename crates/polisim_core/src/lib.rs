//! Policy microsimulation pipeline
//!
//! This crate computes the fiscal and distributional effects of
//! tax/benefit policy reforms, for single households and for whole
//! populations. It owns the layer that decides *what* to compute and
//! *how to avoid recomputing it*:
//! - reform composition from flat parameter overrides
//! - baseline/reformed dual-simulation comparison (with the +1-unit
//!   earnings perturbation behind marginal-rate estimates)
//! - headline and chart-ready metric derivation
//! - content-addressed response caching over an injected blob store
//! - a per-country endpoint registry consumed by the HTTP layer
//!
//! The simulation engine itself is a collaborator behind
//! [`engine::TaxBenefitEngine`]; a stylized reference engine is bundled
//! so the server and the test suite run without an external one.

#![warn(clippy::all)]

// ============================================================================
// Pipeline modules
// ============================================================================

pub mod cache;
pub mod country;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod reform;
pub mod runner;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use cache::{CacheLayer, CacheStore, MemoryStore, Params};
pub use country::{Country, CountryConfig, CountryRegistry, Endpoint};
pub use reform::ParamReformBuilder;
pub use runner::{HouseholdQuad, SimulationRunner};
