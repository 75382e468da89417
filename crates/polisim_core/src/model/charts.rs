//! Chart-ready data series. Rendering is the front-end's job; these are
//! the numeric payloads it consumes.

use serde::{Deserialize, Serialize};

/// Average per-person gain by income decile (1 = poorest, 10 = richest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecileChart {
    pub deciles: Vec<u8>,
    pub average_gain: Vec<f64>,
}

/// Winner/loser/no-change shares within each income decile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntraDecileChart {
    pub deciles: Vec<u8>,
    pub winner_share: Vec<f64>,
    pub loser_share: Vec<f64>,
    pub no_change_share: Vec<f64>,
}

/// Poverty and deep-poverty rates by population subgroup, baseline vs
/// reformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PovertyChart {
    pub groups: Vec<PovertyRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PovertyRow {
    pub group: String,
    pub baseline: f64,
    pub reformed: f64,
    /// Percent change (reformed vs baseline); 0 when the baseline rate
    /// is zero.
    pub change: f64,
    pub baseline_deep: f64,
    pub reformed_deep: f64,
    pub deep_change: f64,
}

/// Signed bars decomposing an aggregate change by component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallChart {
    pub bars: Vec<WaterfallBar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallBar {
    pub label: String,
    pub amount: f64,
}

/// Household net income against swept gross earnings, both scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetChart {
    pub points: Vec<BudgetPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetPoint {
    pub employment_income: f64,
    pub baseline_net_income: f64,
    pub reformed_net_income: f64,
}

/// Marginal tax rate against swept gross earnings, both scenarios.
/// Rates are finite-difference estimates between adjacent sweep points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtrChart {
    pub points: Vec<MtrPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtrPoint {
    pub employment_income: f64,
    pub baseline_mtr: f64,
    pub reformed_mtr: f64,
}
