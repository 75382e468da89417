//! Deriving response metrics from simulation outputs.
//!
//! Everything here is a pure function of the handles it is given: no
//! owned state, deterministic, and defined for every input (divisions
//! by zero resolve to 0.0 sentinels rather than propagating NaN).

pub mod household;
pub mod population;

use serde::{Deserialize, Serialize};

pub use household::{
    HouseholdHeadlines, HouseholdReformResponse, VariableChange, budget_chart, headline_figures,
    household_reform, household_waterfall, marginal_tax_rate, mtr_chart, variable_changes,
};
pub use population::{
    BreakdownResponse, HeadlineMetrics, PopulationReformResponse, ProvisionImpact,
    breakdown_per_provision, decile_chart, deep_poverty_rate, headline_metrics,
    intra_decile_chart, population_reform, population_waterfall, poverty_chart, poverty_rate, ubi,
};

/// One poverty-breakdown subgroup: a label and the boolean population
/// variable (evaluated `> 0`) selecting its members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PovertyGroup {
    pub label: String,
    pub population_variable: String,
}

/// Variable names and sweep settings the deriver reads results through.
/// One record per country; there is no per-country code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    pub net_income_variable: String,
    pub household_net_income_variable: String,
    pub in_poverty_variable: String,
    pub in_deep_poverty_variable: String,
    pub person_variable: String,
    pub earnings_variable: String,
    pub tax_variable: String,
    pub benefits_variable: String,
    pub decile_variable: String,
    pub poverty_groups: Vec<PovertyGroup>,
    /// Earnings increment for budget-constraint sweeps.
    pub sweep_step: f64,
    /// Upper earnings bound for sweeps.
    pub sweep_upper: f64,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        let group = |label: &str, variable: &str| PovertyGroup {
            label: label.to_string(),
            population_variable: variable.to_string(),
        };
        Self {
            net_income_variable: "net_income".to_string(),
            household_net_income_variable: "household_net_income".to_string(),
            in_poverty_variable: "in_poverty".to_string(),
            in_deep_poverty_variable: "in_deep_poverty".to_string(),
            person_variable: "people".to_string(),
            earnings_variable: "employment_income".to_string(),
            tax_variable: "tax".to_string(),
            benefits_variable: "benefits".to_string(),
            decile_variable: "decile".to_string(),
            poverty_groups: vec![
                group("All", "people"),
                group("Children", "is_child"),
                group("Adults", "is_adult"),
                group("Seniors", "is_senior"),
            ],
            sweep_step: 100.0,
            sweep_upper: 200_000.0,
        }
    }
}

/// Percent change, with the zero-baseline edge pinned to 0.0.
#[must_use]
pub fn pct_change(old: f64, new: f64) -> f64 {
    if old == 0.0 { 0.0 } else { (new - old) / old }
}

/// Mean with the empty-slice edge pinned to 0.0.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
