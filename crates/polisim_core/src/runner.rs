//! Constructing and executing baseline/reformed simulation pairs.

use std::sync::Arc;

use crate::engine::{Simulation, TaxBenefitEngine};
use crate::error::EngineError;
use crate::model::{Reform, Situation};

/// The four handles behind the marginal-rate estimate: the scalar pair
/// plus the same pair with earnings forced one currency unit higher.
pub struct HouseholdQuad {
    pub baseline: Box<dyn Simulation>,
    pub reformed: Box<dyn Simulation>,
    pub baseline_perturbed: Box<dyn Simulation>,
    pub reformed_perturbed: Box<dyn Simulation>,
}

/// Owns the process-lifetime baseline simulation and builds reformed
/// counterparts per request.
///
/// The baseline is constructed once from the default reform and the
/// engine's dataset, and is read-only thereafter. User reforms are
/// always applied on top of the default reform (default ∘ user), so the
/// two scenarios differ only by the user's overrides.
pub struct SimulationRunner {
    engine: Arc<dyn TaxBenefitEngine>,
    default_reform: Reform,
    baseline: Box<dyn Simulation>,
}

impl SimulationRunner {
    pub fn new(
        engine: Arc<dyn TaxBenefitEngine>,
        default_reform: Reform,
    ) -> Result<Self, EngineError> {
        let baseline = engine.population_simulation(&default_reform)?;
        Ok(Self {
            engine,
            default_reform,
            baseline,
        })
    }

    /// The shared population baseline. Never rebuilt per request.
    #[must_use]
    pub fn baseline(&self) -> &dyn Simulation {
        self.baseline.as_ref()
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<dyn TaxBenefitEngine> {
        &self.engine
    }

    fn full_reform(&self, user: &Reform) -> Reform {
        self.default_reform.clone().compose(user.clone())
    }

    /// Fresh population simulation with the user reform applied.
    pub fn reformed_population(&self, user: &Reform) -> Result<Box<dyn Simulation>, EngineError> {
        self.engine.population_simulation(&self.full_reform(user))
    }

    /// Fresh baseline/reformed pair for a single household.
    pub fn household_pair(
        &self,
        situation: &Situation,
        user: &Reform,
    ) -> Result<(Box<dyn Simulation>, Box<dyn Simulation>), EngineError> {
        let baseline = self
            .engine
            .household_simulation(situation, &self.default_reform)?;
        let reformed = self
            .engine
            .household_simulation(situation, &self.full_reform(user))?;
        Ok((baseline, reformed))
    }

    /// Household pair plus the finite-difference probes: two more
    /// handles, identical except `variable` is forced to its computed
    /// value plus `delta`. Same situation, same reforms; only the forced
    /// input differs.
    pub fn household_with_perturbation(
        &self,
        situation: &Situation,
        user: &Reform,
        variable: &str,
        delta: f64,
    ) -> Result<HouseholdQuad, EngineError> {
        let (baseline, reformed) = self.household_pair(situation, user)?;

        let mut baseline_perturbed = self
            .engine
            .household_simulation(situation, &self.default_reform)?;
        let values: Vec<f64> = baseline
            .calc(variable, None)?
            .iter()
            .map(|v| v + delta)
            .collect();
        let year = baseline_perturbed.year();
        baseline_perturbed.set_input(variable, year, values)?;

        let mut reformed_perturbed = self
            .engine
            .household_simulation(situation, &self.full_reform(user))?;
        let values: Vec<f64> = reformed
            .calc(variable, None)?
            .iter()
            .map(|v| v + delta)
            .collect();
        let year = reformed_perturbed.year();
        reformed_perturbed.set_input(variable, year, values)?;

        Ok(HouseholdQuad {
            baseline,
            reformed,
            baseline_perturbed,
            reformed_perturbed,
        })
    }
}
