//! End-to-end population pipeline and registry dispatch tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use crate::cache::{CacheLayer, MemoryStore, Params};
use crate::country::{Country, CountryConfig, CountryRegistry};
use crate::engine::stylized::{
    Dataset, HouseholdRecord, P_BASIC_RATE, P_BASIC_INCOME, P_CHILD_BENEFIT, PersonRecord,
    StylizedEngine,
};
use crate::engine::{Simulation, TaxBenefitEngine};
use crate::error::{DispatchError, EngineError};
use crate::metrics::{self, ResultsConfig};
use crate::model::{ParameterTree, Reform, Situation, VariableMetadata};
use crate::reform::ParamReformBuilder;
use crate::runner::SimulationRunner;

fn runner(engine: StylizedEngine) -> SimulationRunner {
    SimulationRunner::new(Arc::new(engine), Reform::identity()).unwrap()
}

fn reform_of(pairs: &[(&str, serde_json::Value)]) -> (Params, Reform) {
    let engine = StylizedEngine::uk();
    let params: Params = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    let reform = ParamReformBuilder::new(engine.parameters())
        .build(&params)
        .unwrap();
    (params, reform)
}

#[test]
fn empty_reform_reproduces_baseline_everywhere() {
    let runner = runner(StylizedEngine::uk());
    let reformed = runner.reformed_population(&Reform::identity()).unwrap();
    for variable in [
        "employment_income",
        "tax",
        "benefits",
        "net_income",
        "household_net_income",
        "in_poverty",
        "decile",
    ] {
        assert_eq!(
            reformed.calc(variable, None).unwrap(),
            runner.baseline().calc(variable, None).unwrap(),
            "variable {variable} diverged under the identity reform"
        );
    }
}

#[test]
fn shares_partition_the_population() {
    let runner = runner(StylizedEngine::uk());
    let config = ResultsConfig::default();
    let (_, reform) = reform_of(&[(P_BASIC_RATE, json!(0.25))]);
    let reformed = runner.reformed_population(&reform).unwrap();

    let headline =
        metrics::headline_metrics(runner.baseline(), reformed.as_ref(), &config).unwrap();
    let gains = metrics::population::person_gains(runner.baseline(), reformed.as_ref(), &config)
        .unwrap();
    let no_change = gains.iter().filter(|&&g| g == 0.0).count() as f64 / gains.len() as f64;

    let total = headline.winner_share + headline.loser_share + no_change;
    assert!((total - 1.0).abs() < 1e-9, "shares sum to {total}");
    // A pure tax rise makes no winners.
    assert_eq!(headline.winner_share, 0.0);
    assert!(headline.loser_share > 0.0);
}

#[test]
fn ubi_matches_revenue_over_person_count() {
    let runner = runner(StylizedEngine::uk());
    let config = ResultsConfig::default();

    // Revenue-raising reform: higher basic rate.
    let (_, raise) = reform_of(&[(P_BASIC_RATE, json!(0.30))]);
    let reformed = runner.reformed_population(&raise).unwrap();
    let old_total: f64 = runner
        .baseline()
        .calc("net_income", None)
        .unwrap()
        .iter()
        .sum();
    let new_total: f64 = reformed.calc("net_income", None).unwrap().iter().sum();
    let persons: f64 = runner
        .baseline()
        .calc("people", None)
        .unwrap()
        .iter()
        .sum();
    let expected = ((old_total - new_total) / persons).max(0.0);
    let amount = metrics::ubi(runner.baseline(), reformed.as_ref(), &config).unwrap();
    assert_eq!(amount, expected);
    assert!(amount > 0.0);

    // Revenue-losing reform: a new basic income floors UBI at zero.
    let (_, spend) = reform_of(&[(P_BASIC_INCOME, json!(2_000.0))]);
    let reformed = runner.reformed_population(&spend).unwrap();
    let amount = metrics::ubi(runner.baseline(), reformed.as_ref(), &config).unwrap();
    assert_eq!(amount, 0.0);
}

#[test]
fn empty_subgroup_poverty_rate_is_zero() {
    // A dataset with no seniors: the senior subgroup mask is empty.
    let tree = StylizedEngine::uk().parameters().clone();
    let dataset = Dataset {
        households: vec![HouseholdRecord {
            people: vec![PersonRecord {
                age: 30.0,
                employment_income: 5_000.0,
            }],
        }],
    };
    let engine = StylizedEngine::new(tree, dataset, 2025);
    let runner = runner(engine);
    let config = ResultsConfig::default();
    let rate = metrics::poverty_rate(runner.baseline(), "is_senior", &config).unwrap();
    assert_eq!(rate, 0.0);
}

#[test]
fn raising_a_benefit_costs_revenue_and_fills_ten_deciles() {
    // Two-household scenario from the acceptance checklist, scaled to
    // the full synthetic dataset for the decile chart.
    let runner = runner(StylizedEngine::uk());
    let config = ResultsConfig::default();

    let identity = runner.reformed_population(&Reform::identity()).unwrap();
    let zero_case =
        metrics::headline_metrics(runner.baseline(), identity.as_ref(), &config).unwrap();
    assert_eq!(zero_case.budgetary_impact, 0.0);

    let (_, reform) = reform_of(&[(P_CHILD_BENEFIT, json!(3_000.0))]);
    let reformed = runner.reformed_population(&reform).unwrap();
    let response =
        metrics::population_reform(runner.baseline(), reformed.as_ref(), &config).unwrap();

    // More generous child benefit raises household incomes: positive
    // budgetary impact under the reformed-minus-baseline convention,
    // i.e. a cost to revenue.
    assert!(response.headline.budgetary_impact > zero_case.budgetary_impact);
    assert_eq!(response.decile_chart.deciles.len(), 10);
    assert_eq!(response.decile_chart.average_gain.len(), 10);
    assert_eq!(response.intra_decile_chart.deciles.len(), 10);

    // Per-decile shares partition each populated decile.
    let chart = &response.intra_decile_chart;
    for bin in 0..10 {
        let total =
            chart.winner_share[bin] + chart.loser_share[bin] + chart.no_change_share[bin];
        assert!((total - 1.0).abs() < 1e-9, "decile {bin} shares sum to {total}");
    }
}

#[test]
fn tax_rise_is_strictly_revenue_positive() {
    let runner = runner(StylizedEngine::uk());
    let config = ResultsConfig::default();
    let (_, reform) = reform_of(&[(P_BASIC_RATE, json!(0.30))]);
    let reformed = runner.reformed_population(&reform).unwrap();
    let headline =
        metrics::headline_metrics(runner.baseline(), reformed.as_ref(), &config).unwrap();
    assert!(headline.budgetary_impact < 0.0);
}

/// Engine wrapper counting population-simulation constructions.
struct CountingEngine {
    inner: StylizedEngine,
    builds: Arc<AtomicUsize>,
}

impl TaxBenefitEngine for CountingEngine {
    fn parameters(&self) -> &ParameterTree {
        self.inner.parameters()
    }

    fn variables(&self) -> &[VariableMetadata] {
        self.inner.variables()
    }

    fn population_simulation(
        &self,
        reform: &Reform,
    ) -> Result<Box<dyn Simulation>, EngineError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.inner.population_simulation(reform)
    }

    fn household_simulation(
        &self,
        situation: &Situation,
        reform: &Reform,
    ) -> Result<Box<dyn Simulation>, EngineError> {
        self.inner.household_simulation(situation, reform)
    }
}

#[test]
fn breakdown_runs_one_simulation_per_provision() {
    let builds = Arc::new(AtomicUsize::new(0));
    let engine = CountingEngine {
        inner: StylizedEngine::uk(),
        builds: Arc::clone(&builds),
    };
    let runner = SimulationRunner::new(Arc::new(engine), Reform::identity()).unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 1, "baseline built once");

    let params: Params = [
        (P_BASIC_RATE.to_string(), json!(0.25)),
        (P_CHILD_BENEFIT.to_string(), json!(2_000.0)),
    ]
    .into_iter()
    .collect();
    let (reform, provisions) = ParamReformBuilder::new(runner.engine().parameters())
        .build_with_descriptions(&params)
        .unwrap();

    let config = ResultsConfig::default();
    let response =
        metrics::breakdown_per_provision(&runner, &reform, &provisions, &config).unwrap();

    assert_eq!(response.provisions.len(), 2);
    // One reformed simulation per provision, zero baseline rebuilds.
    assert_eq!(builds.load(Ordering::SeqCst), 1 + 2);
}

#[test]
fn dispatch_resolves_countries_and_endpoints() {
    let cache = CacheLayer::new(Box::new(MemoryStore::new()), "test");
    let registry = CountryRegistry::bundled(cache).unwrap();

    assert!(matches!(
        registry.dispatch("fr", "ubi", &Params::new()),
        Err(DispatchError::UnknownCountry(_))
    ));
    assert!(matches!(
        registry.dispatch("uk", "nonsense", &Params::new()),
        Err(DispatchError::UnknownEndpoint { .. })
    ));

    // Hyphenated route names resolve underscore endpoints.
    let payload = registry
        .dispatch("uk", "default-household", &Params::new())
        .unwrap();
    assert!(payload.get("people").is_some());
}

#[test]
fn dispatch_population_reform_end_to_end() {
    let cache = CacheLayer::new(Box::new(MemoryStore::new()), "test");
    let registry = CountryRegistry::bundled(cache).unwrap();
    let params: Params = [(P_BASIC_RATE.to_string(), json!(0.25))].into_iter().collect();

    let payload = registry
        .dispatch("uk", "population-reform", &params)
        .unwrap();
    assert!(payload.get("budgetaryImpact").unwrap().as_f64().unwrap() < 0.0);
    assert!(payload.get("decile_chart").is_some());
    assert!(payload.get("poverty_chart").is_some());

    // The reformed scenario is fresh per request; a second dispatch is
    // identical by determinism.
    let again = registry
        .dispatch("uk", "population-reform", &params)
        .unwrap();
    assert_eq!(payload, again);
}

#[test]
fn countries_are_isolated_configurations() {
    let cache = CacheLayer::disabled("test");
    let mut registry = CountryRegistry::new(cache);
    registry.register(
        Country::new(CountryConfig::uk(), Arc::new(StylizedEngine::uk())).unwrap(),
    );
    registry.register(
        Country::new(CountryConfig::us(), Arc::new(StylizedEngine::us())).unwrap(),
    );

    let uk = registry.dispatch("uk", "parameters", &Params::new()).unwrap();
    let us = registry.dispatch("us", "parameters", &Params::new()).unwrap();
    assert_ne!(uk, us);
}
