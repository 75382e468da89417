//! The simulation-engine collaborator interface.
//!
//! The pipeline never depends on rule semantics: it talks to the engine
//! through [`TaxBenefitEngine`] (construction + introspection) and
//! [`Simulation`] (pull-based evaluation). The bundled [`stylized`]
//! engine implements both so the server boots and the test suite runs
//! without an external engine.

pub mod stylized;

use crate::error::EngineError;
use crate::model::{Entity, ParameterTree, Reform, Situation, VariableMetadata};

/// One point of a swept evaluation: the forced input value and the
/// resulting target-variable total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub input: f64,
    pub output: f64,
}

/// An engine-owned simulation bound to a (reform, dataset, year) triple.
///
/// Handles are created per request and never persisted across requests.
/// `calc` is read-only; lazy internal caching, if an engine has any, must
/// hide behind `&self`.
pub trait Simulation: Send + Sync {
    /// Evaluate a variable, optionally mapped to a different entity
    /// level (person values sum to household; household values broadcast
    /// to members). Booleans come back as 0/1.
    fn calc(&self, variable: &str, map_to: Option<Entity>) -> Result<Vec<f64>, EngineError>;

    /// Force a person-level input for the given period, replacing the
    /// dataset values. Downstream variables recompute from the forced
    /// values on the next `calc`.
    fn set_input(&mut self, variable: &str, year: i16, values: Vec<f64>) -> Result<(), EngineError>;

    /// Sweep `variable` from zero to `upper` in `step` increments,
    /// re-evaluating `target` (summed over the simulation) at each
    /// point. The handle itself is left untouched.
    fn vary(
        &self,
        variable: &str,
        target: &str,
        step: f64,
        upper: f64,
    ) -> Result<Vec<SweepPoint>, EngineError>;

    /// The period the simulation evaluates.
    fn year(&self) -> i16;
}

/// Engine construction and introspection, one instance per jurisdiction.
pub trait TaxBenefitEngine: Send + Sync {
    /// Serializable tree of known parameter paths with baseline values.
    fn parameters(&self) -> &ParameterTree;

    /// Flat list of variable metadata for the `variables` endpoint.
    fn variables(&self) -> &[VariableMetadata];

    /// Build a population-level simulation over the engine's dataset
    /// with the reform applied.
    fn population_simulation(&self, reform: &Reform) -> Result<Box<dyn Simulation>, EngineError>;

    /// Build a single-household simulation from a validated situation
    /// with the reform applied.
    fn household_simulation(
        &self,
        situation: &Situation,
        reform: &Reform,
    ) -> Result<Box<dyn Simulation>, EngineError>;
}
