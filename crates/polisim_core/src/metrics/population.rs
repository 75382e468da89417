//! Population-level metrics: headline aggregates, distributional charts,
//! UBI sizing, and the per-provision breakdown.

use serde::{Deserialize, Serialize};

use crate::engine::Simulation;
use crate::error::EngineError;
use crate::metrics::{ResultsConfig, mean, pct_change};
use crate::model::{
    DecileChart, Entity, IntraDecileChart, PovertyChart, PovertyRow, ProvisionDescription, Reform,
    WaterfallBar, WaterfallChart,
};
use crate::runner::SimulationRunner;

/// The four society-wide headline figures, as primitive floats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeadlineMetrics {
    /// Sum over households of reformed minus baseline net income.
    /// Positive = the reform costs revenue.
    #[serde(rename = "budgetaryImpact")]
    pub budgetary_impact: f64,
    /// Percent change in the poverty-rate mean, 0 when baseline is 0.
    #[serde(rename = "povertyChange")]
    pub poverty_change: f64,
    /// Fraction of persons with strictly positive gain.
    #[serde(rename = "winnerShare")]
    pub winner_share: f64,
    /// Fraction of persons with strictly negative gain.
    #[serde(rename = "loserShare")]
    pub loser_share: f64,
}

/// Per-person income gain: reformed minus baseline net income, both
/// mapped to person level.
pub fn person_gains(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<Vec<f64>, EngineError> {
    let old = baseline.calc(&config.household_net_income_variable, Some(Entity::Person))?;
    let new = reformed.calc(&config.household_net_income_variable, Some(Entity::Person))?;
    Ok(new.iter().zip(&old).map(|(n, o)| n - o).collect())
}

pub fn headline_metrics(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<HeadlineMetrics, EngineError> {
    let gain = person_gains(baseline, reformed, config)?;

    let old_total: f64 = baseline
        .calc(&config.household_net_income_variable, None)?
        .iter()
        .sum();
    let new_total: f64 = reformed
        .calc(&config.household_net_income_variable, None)?
        .iter()
        .sum();

    let old_poverty = mean(&baseline.calc(&config.in_poverty_variable, Some(Entity::Person))?);
    let new_poverty = mean(&reformed.calc(&config.in_poverty_variable, Some(Entity::Person))?);

    let winners = gain.iter().filter(|&&g| g > 0.0).count();
    let losers = gain.iter().filter(|&&g| g < 0.0).count();
    let n = gain.len().max(1);

    Ok(HeadlineMetrics {
        budgetary_impact: new_total - old_total,
        poverty_change: pct_change(old_poverty, new_poverty),
        winner_share: winners as f64 / n as f64,
        loser_share: losers as f64 / n as f64,
    })
}

/// Mean of the poverty indicator over persons in the subgroup selected
/// by `population_variable > 0`. An empty subgroup reads as 0.0.
pub fn poverty_rate(
    sim: &dyn Simulation,
    population_variable: &str,
    config: &ResultsConfig,
) -> Result<f64, EngineError> {
    subgroup_rate(sim, &config.in_poverty_variable, population_variable)
}

pub fn deep_poverty_rate(
    sim: &dyn Simulation,
    population_variable: &str,
    config: &ResultsConfig,
) -> Result<f64, EngineError> {
    subgroup_rate(sim, &config.in_deep_poverty_variable, population_variable)
}

fn subgroup_rate(
    sim: &dyn Simulation,
    indicator_variable: &str,
    population_variable: &str,
) -> Result<f64, EngineError> {
    let indicator = sim.calc(indicator_variable, Some(Entity::Person))?;
    let mask = sim.calc(population_variable, Some(Entity::Person))?;
    let selected: Vec<f64> = indicator
        .iter()
        .zip(&mask)
        .filter(|&(_, &m)| m > 0.0)
        .map(|(&v, _)| v)
        .collect();
    Ok(mean(&selected))
}

/// Average per-person gain in each income decile. Always exactly ten
/// bins, ranked by the baseline decile variable.
pub fn decile_chart(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<DecileChart, EngineError> {
    let gain = person_gains(baseline, reformed, config)?;
    let deciles = baseline.calc(&config.decile_variable, Some(Entity::Person))?;

    let mut sums = [0.0; 10];
    let mut counts = [0usize; 10];
    for (g, d) in gain.iter().zip(&deciles) {
        let bin = (*d as usize).clamp(1, 10) - 1;
        sums[bin] += g;
        counts[bin] += 1;
    }
    let average_gain = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
        .collect();
    Ok(DecileChart {
        deciles: (1..=10).collect(),
        average_gain,
    })
}

/// Winner/loser/no-change shares within each decile.
pub fn intra_decile_chart(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<IntraDecileChart, EngineError> {
    let gain = person_gains(baseline, reformed, config)?;
    let deciles = baseline.calc(&config.decile_variable, Some(Entity::Person))?;

    let mut winners = [0usize; 10];
    let mut losers = [0usize; 10];
    let mut counts = [0usize; 10];
    for (g, d) in gain.iter().zip(&deciles) {
        let bin = (*d as usize).clamp(1, 10) - 1;
        counts[bin] += 1;
        if *g > 0.0 {
            winners[bin] += 1;
        } else if *g < 0.0 {
            losers[bin] += 1;
        }
    }

    let share = |hits: &[usize; 10], bin: usize| {
        if counts[bin] == 0 {
            0.0
        } else {
            hits[bin] as f64 / counts[bin] as f64
        }
    };
    let winner_share: Vec<f64> = (0..10).map(|b| share(&winners, b)).collect();
    let loser_share: Vec<f64> = (0..10).map(|b| share(&losers, b)).collect();
    let no_change_share = winner_share
        .iter()
        .zip(&loser_share)
        .zip(&counts)
        .map(|((w, l), &c)| if c == 0 { 0.0 } else { 1.0 - w - l })
        .collect();

    Ok(IntraDecileChart {
        deciles: (1..=10).collect(),
        winner_share,
        loser_share,
        no_change_share,
    })
}

/// Poverty and deep-poverty rates by subgroup, baseline vs reformed.
pub fn poverty_chart(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<PovertyChart, EngineError> {
    let mut groups = Vec::with_capacity(config.poverty_groups.len());
    for group in &config.poverty_groups {
        let old = poverty_rate(baseline, &group.population_variable, config)?;
        let new = poverty_rate(reformed, &group.population_variable, config)?;
        let old_deep = deep_poverty_rate(baseline, &group.population_variable, config)?;
        let new_deep = deep_poverty_rate(reformed, &group.population_variable, config)?;
        groups.push(PovertyRow {
            group: group.label.clone(),
            baseline: old,
            reformed: new,
            change: pct_change(old, new),
            baseline_deep: old_deep,
            reformed_deep: new_deep,
            deep_change: pct_change(old_deep, new_deep),
        });
    }
    Ok(PovertyChart { groups })
}

/// Budgetary impact decomposed into the tax and benefit sides. Bars sum
/// to the headline budgetary impact (earnings are held fixed).
pub fn population_waterfall(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<WaterfallChart, EngineError> {
    let total = |sim: &dyn Simulation, variable: &str| -> Result<f64, EngineError> {
        Ok(sim.calc(variable, None)?.iter().sum())
    };
    let tax_change = total(reformed, &config.tax_variable)? - total(baseline, &config.tax_variable)?;
    let benefit_change =
        total(reformed, &config.benefits_variable)? - total(baseline, &config.benefits_variable)?;
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
                label: "Net".to_string(),
                amount: benefit_change - tax_change,
            },
        ],
    })
}

/// Revenue-neutral uniform transfer: the per-person amount the reform's
/// raised revenue would fund, floored at zero. A reform that loses
/// revenue yields 0, never a negative transfer.
pub fn ubi(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<f64, EngineError> {
    let old_total: f64 = baseline.calc(&config.net_income_variable, None)?.iter().sum();
    let new_total: f64 = reformed.calc(&config.net_income_variable, None)?.iter().sum();
    let revenue = old_total - new_total;
    let persons: f64 = baseline.calc(&config.person_variable, None)?.iter().sum();
    if persons == 0.0 {
        return Ok(0.0);
    }
    Ok((revenue / persons).max(0.0))
}

/// Full population-reform payload: headline metrics plus the four
/// distributional charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationReformResponse {
    #[serde(flatten)]
    pub headline: HeadlineMetrics,
    pub decile_chart: DecileChart,
    pub poverty_chart: PovertyChart,
    pub waterfall_chart: WaterfallChart,
    pub intra_decile_chart: IntraDecileChart,
}

pub fn population_reform(
    baseline: &dyn Simulation,
    reformed: &dyn Simulation,
    config: &ResultsConfig,
) -> Result<PopulationReformResponse, EngineError> {
    Ok(PopulationReformResponse {
        headline: headline_metrics(baseline, reformed, config)?,
        decile_chart: decile_chart(baseline, reformed, config)?,
        poverty_chart: poverty_chart(baseline, reformed, config)?,
        waterfall_chart: population_waterfall(baseline, reformed, config)?,
        intra_decile_chart: intra_decile_chart(baseline, reformed, config)?,
    })
}

/// Marginal contribution of one provision, holding all others at
/// baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionImpact {
    pub path: String,
    pub label: String,
    #[serde(rename = "budgetaryImpact")]
    pub budgetary_impact: f64,
    #[serde(rename = "povertyChange")]
    pub poverty_change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownResponse {
    pub provisions: Vec<ProvisionImpact>,
}

/// Rerun the population comparison once per provision, each time with
/// only that override applied. One reformed simulation per provision;
/// the shared baseline handle is reused throughout, never rebuilt.
///
/// This is the most expensive operation in the system and has no
/// internal deadline: k provisions cost k full simulations.
pub fn breakdown_per_provision(
    runner: &SimulationRunner,
    reform: &Reform,
    provisions: &[ProvisionDescription],
    config: &ResultsConfig,
) -> Result<BreakdownResponse, EngineError> {
    let mut rows = Vec::with_capacity(provisions.len());
    for (entry, provision) in reform.overrides().iter().zip(provisions) {
        let single = Reform::from_overrides(vec![entry.clone()]);
        let reformed = runner.reformed_population(&single)?;
        let headline = headline_metrics(runner.baseline(), reformed.as_ref(), config)?;
        rows.push(ProvisionImpact {
            path: provision.path.clone(),
            label: provision.label.clone(),
            budgetary_impact: headline.budgetary_impact,
            poverty_change: headline.poverty_change,
        });
    }
    Ok(BreakdownResponse { provisions: rows })
}
