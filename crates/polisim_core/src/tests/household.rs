//! Situation parsing, perturbation probes, and household metrics.

use std::sync::Arc;

use serde_json::json;

use crate::cache::Params;
use crate::engine::TaxBenefitEngine;
use crate::engine::stylized::{P_BASIC_INCOME, P_BASIC_RATE, StylizedEngine};
use crate::error::SituationError;
use crate::metrics::{self, ResultsConfig};
use crate::model::{Reform, Situation};
use crate::reform::ParamReformBuilder;
use crate::runner::SimulationRunner;

fn uk_runner() -> SimulationRunner {
    SimulationRunner::new(Arc::new(StylizedEngine::uk()), Reform::identity()).unwrap()
}

fn single_adult(income: f64) -> Situation {
    let engine = StylizedEngine::uk();
    let value = json!({
        "people": { "adult": { "age": 35, "employment_income": income } }
    });
    Situation::from_value(Some(&value), engine.variables()).unwrap()
}

fn reform_from(pairs: &[(&str, serde_json::Value)]) -> Reform {
    let engine = StylizedEngine::uk();
    let params: Params = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    ParamReformBuilder::new(engine.parameters())
        .build(&params)
        .unwrap()
}

#[test]
fn situation_requires_a_household() {
    let engine = StylizedEngine::uk();
    assert!(matches!(
        Situation::from_value(None, engine.variables()),
        Err(SituationError::MissingHousehold)
    ));

    let empty = json!({ "people": {} });
    assert!(matches!(
        Situation::from_value(Some(&empty), engine.variables()),
        Err(SituationError::EmptyHousehold)
    ));
}

#[test]
fn situation_rejects_unknown_variables() {
    let engine = StylizedEngine::uk();
    let value = json!({
        "people": { "adult": { "age": 35, "shoe_size": 42 } }
    });
    let err = Situation::from_value(Some(&value), engine.variables()).unwrap_err();
    assert!(matches!(
        err,
        SituationError::UnknownVariable { variable, .. } if variable == "shoe_size"
    ));
}

#[test]
fn situation_rejects_computed_variables_as_inputs() {
    // net_income is an output; a situation cannot force it.
    let engine = StylizedEngine::uk();
    let value = json!({
        "people": { "adult": { "net_income": 50_000 } }
    });
    assert!(Situation::from_value(Some(&value), engine.variables()).is_err());
}

#[test]
fn perturbation_reuses_situation_and_reform() {
    let runner = uk_runner();
    let situation = single_adult(30_000.0);
    let reform = reform_from(&[(P_BASIC_INCOME, json!(1_000.0))]);
    let quad = runner
        .household_with_perturbation(&situation, &reform, "employment_income", 1.0)
        .unwrap();

    let gross = |sim: &dyn crate::engine::Simulation| -> f64 {
        sim.calc("employment_income", None).unwrap().iter().sum()
    };
    // Only the forced input differs between each pair.
    assert_eq!(gross(quad.baseline.as_ref()) + 1.0, gross(quad.baseline_perturbed.as_ref()));
    assert_eq!(gross(quad.reformed.as_ref()) + 1.0, gross(quad.reformed_perturbed.as_ref()));

    // The reform is worth exactly the basic income to this household.
    let net = |sim: &dyn crate::engine::Simulation| -> f64 {
        sim.calc("net_income", None).unwrap().iter().sum()
    };
    let gain = net(quad.reformed.as_ref()) - net(quad.baseline.as_ref());
    assert!((gain - 1_000.0).abs() < 1e-9);
}

#[test]
fn flat_region_mtr_matches_statutory_rate() {
    // 30k sits inside the basic band: statutory marginal rate is 20%.
    let runner = uk_runner();
    let config = ResultsConfig::default();
    let situation = single_adult(30_000.0);
    let quad = runner
        .household_with_perturbation(&situation, &Reform::identity(), "employment_income", 1.0)
        .unwrap();

    let mtr = metrics::marginal_tax_rate(
        quad.baseline.as_ref(),
        quad.baseline_perturbed.as_ref(),
        &config,
    )
    .unwrap();
    assert!((mtr - 0.20).abs() < 1e-6, "got {mtr}");
}

#[test]
fn mtr_below_allowance_is_zero() {
    let runner = uk_runner();
    let config = ResultsConfig::default();
    let situation = single_adult(8_000.0);
    let quad = runner
        .household_with_perturbation(&situation, &Reform::identity(), "employment_income", 1.0)
        .unwrap();
    let mtr = metrics::marginal_tax_rate(
        quad.baseline.as_ref(),
        quad.baseline_perturbed.as_ref(),
        &config,
    )
    .unwrap();
    assert!(mtr.abs() < 1e-9, "got {mtr}");
}

#[test]
fn household_reform_payload_is_complete() {
    let runner = uk_runner();
    let config = ResultsConfig {
        sweep_upper: 10_000.0,
        sweep_step: 1_000.0,
        ..ResultsConfig::default()
    };
    let situation = single_adult(30_000.0);
    let reform = reform_from(&[(P_BASIC_RATE, json!(0.25))]);
    let quad = runner
        .household_with_perturbation(&situation, &reform, "employment_income", 1.0)
        .unwrap();

    let response = metrics::household_reform(&quad, &config).unwrap();
    assert!(response.headline.net_income_change < 0.0);
    assert_eq!(response.budget_chart.points.len(), 11);
    assert_eq!(response.mtr_chart.points.len(), 10);
    assert_eq!(response.variables.len(), 4);

    // Higher basic rate: reformed net income never exceeds baseline
    // along the earnings axis.
    for point in &response.budget_chart.points {
        assert!(point.reformed_net_income <= point.baseline_net_income + 1e-9);
    }
}

#[test]
fn sweep_does_not_pollute_scalar_handles() {
    let runner = uk_runner();
    let config = ResultsConfig {
        sweep_upper: 50_000.0,
        sweep_step: 5_000.0,
        ..ResultsConfig::default()
    };
    let situation = single_adult(30_000.0);
    let (baseline, reformed) = runner
        .household_pair(&situation, &Reform::identity())
        .unwrap();

    let before: f64 = baseline.calc("net_income", None).unwrap().iter().sum();
    metrics::budget_chart(baseline.as_ref(), reformed.as_ref(), &config).unwrap();
    let after: f64 = baseline.calc("net_income", None).unwrap().iter().sum();
    assert_eq!(before, after);
}
