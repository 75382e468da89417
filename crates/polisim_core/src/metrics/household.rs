//! Household-level metrics: headline figures, component waterfall,
//! budget-constraint and marginal-rate charts.

use serde::{Deserialize, Serialize};

use crate::engine::Simulation;
use crate::error::EngineError;
use crate::metrics::ResultsConfig;
use crate::model::{
    BudgetChart, BudgetPoint, MtrChart, MtrPoint, WaterfallBar, WaterfallChart,
};
use crate::runner::HouseholdQuad;

fn total(sim: &dyn Simulation, variable: &str) -> Result<f64, EngineError> {
    Ok(sim.calc(variable, None)?.iter().sum())
}

/// Before/after household totals for the headline box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HouseholdHeadlines {
    pub baseline_net_income: f64,
    pub reformed_net_income: f64,
    pub baseline_tax: f64,
    pub reformed_tax: f64,
    pub baseline_benefits: f64,
    pub reformed_benefits: f64,
    /// Reformed minus baseline net income.
    pub net_income_change: f64,
}

pub fn headline_figures(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<HouseholdHeadlines, EngineError> {
    let baseline_net_income = total(baseline, &config.net_income_variable)?;
    let reformed_net_income = total(reformed, &config.net_income_variable)?;
    Ok(HouseholdHeadlines {
        baseline_net_income,
        reformed_net_income,
        baseline_tax: total(baseline, &config.tax_variable)?,
        reformed_tax: total(reformed, &config.tax_variable)?,
        baseline_benefits: total(baseline, &config.benefits_variable)?,
        reformed_benefits: total(reformed, &config.benefits_variable)?,
        net_income_change: reformed_net_income - baseline_net_income,
    })
}

/// Net-income change itemized by income component. Tax bars carry the
/// sign of their effect on net income.
pub fn household_waterfall(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<WaterfallChart, EngineError> {
    let tax_change = total(reformed, &config.tax_variable)? - total(baseline, &config.tax_variable)?;
    let benefit_change =
        total(reformed, &config.benefits_variable)? - total(baseline, &config.benefits_variable)?;
    let net_change =
        total(reformed, &config.net_income_variable)? - total(baseline, &config.net_income_variable)?;
    Ok(WaterfallChart {
        bars: vec![
            WaterfallBar {
                label: "Tax".to_string(),
                amount: -tax_change,
            },
            WaterfallBar {
                label: "Benefits".to_string(),
                amount: benefit_change,
            },
            WaterfallBar {
                label: "Net income".to_string(),
                amount: net_change,
            },
        ],
    })
}

/// Finite-difference marginal tax rate from an unperturbed/perturbed
/// pair: the share of the extra earnings lost to taxes and withdrawn
/// benefits. A degenerate (zero) earnings delta reads as 0.0.
pub fn marginal_tax_rate(
    unperturbed: &dyn Simulation,
    perturbed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<f64, EngineError> {
    let gross_delta = total(perturbed, &config.earnings_variable)?
        - total(unperturbed, &config.earnings_variable)?;
    if gross_delta == 0.0 {
        return Ok(0.0);
    }
    let net_delta =
        total(perturbed, &config.net_income_variable)? - total(unperturbed, &config.net_income_variable)?;
    Ok(1.0 - net_delta / gross_delta)
}

/// Per-variable before/after values, including the +1-unit probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableChange {
    pub variable: String,
    pub baseline: f64,
    pub reformed: f64,
    pub baseline_perturbed: f64,
    pub reformed_perturbed: f64,
}

pub fn variable_changes(
    quad: &HouseholdQuad,
    config: &ResultsConfig,
) -> Result<Vec<VariableChange>, EngineError> {
    let variables = [
        &config.earnings_variable,
        &config.tax_variable,
        &config.benefits_variable,
        &config.net_income_variable,
    ];
    let mut out = Vec::with_capacity(variables.len());
    for variable in variables {
        out.push(VariableChange {
            variable: variable.clone(),
            baseline: total(quad.baseline.as_ref(), variable)?,
            reformed: total(quad.reformed.as_ref(), variable)?,
            baseline_perturbed: total(quad.baseline_perturbed.as_ref(), variable)?,
            reformed_perturbed: total(quad.reformed_perturbed.as_ref(), variable)?,
        });
    }
    Ok(out)
}

/// Net income against swept gross earnings for both scenarios.
pub fn budget_chart(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<BudgetChart, EngineError> {
    let old = baseline.vary(
        &config.earnings_variable,
        &config.net_income_variable,
        config.sweep_step,
        config.sweep_upper,
    )?;
    let new = reformed.vary(
        &config.earnings_variable,
        &config.net_income_variable,
        config.sweep_step,
        config.sweep_upper,
    )?;
    let points = old
        .iter()
        .zip(&new)
        .map(|(b, r)| BudgetPoint {
            employment_income: b.input,
            baseline_net_income: b.output,
            reformed_net_income: r.output,
        })
        .collect();
    Ok(BudgetChart { points })
}

/// Marginal tax rate along the earnings axis, as finite differences
/// between adjacent sweep points. One point fewer than the sweep.
pub fn mtr_chart(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<MtrChart, EngineError> {
    let budget = budget_chart(baseline, reformed, config)?;
    Ok(mtr_from_budget(&budget))
}

fn mtr_from_budget(budget: &BudgetChart) -> MtrChart {
    let rate = |lo: f64, hi: f64, step: f64| {
        if step == 0.0 { 0.0 } else { 1.0 - (hi - lo) / step }
    };
    let points = budget
        .points
        .windows(2)
        .map(|pair| {
            let step = pair[1].employment_income - pair[0].employment_income;
            MtrPoint {
                employment_income: pair[1].employment_income,
                baseline_mtr: rate(pair[0].baseline_net_income, pair[1].baseline_net_income, step),
                reformed_mtr: rate(pair[0].reformed_net_income, pair[1].reformed_net_income, step),
            }
        })
        .collect();
    MtrChart { points }
}

/// Full household-reform payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdReformResponse {
    #[serde(flatten)]
    pub headline: HouseholdHeadlines,
    pub baseline_mtr: f64,
    pub reformed_mtr: f64,
    pub waterfall_chart: WaterfallChart,
    pub budget_chart: BudgetChart,
    pub mtr_chart: MtrChart,
    pub variables: Vec<VariableChange>,
}

pub fn household_reform(
    quad: &HouseholdQuad,
    config: &ResultsConfig,
) -> Result<HouseholdReformResponse, EngineError> {
    let baseline = quad.baseline.as_ref();
    let reformed = quad.reformed.as_ref();
    Ok(HouseholdReformResponse {
        headline: headline_figures(baseline, reformed, config)?,
        baseline_mtr: marginal_tax_rate(baseline, quad.baseline_perturbed.as_ref(), config)?,
        reformed_mtr: marginal_tax_rate(reformed, quad.reformed_perturbed.as_ref(), config)?,
        waterfall_chart: household_waterfall(baseline, reformed, config)?,
        budget_chart: budget_chart(baseline, reformed, config)?,
        mtr_chart: mtr_chart(baseline, reformed, config)?,
        variables: variable_changes(quad, config)?,
    })
}
