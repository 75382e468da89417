//! Per-country configuration and the endpoint registry.
//!
//! A country is a data-driven configuration record consumed by one
//! generic pipeline; there are no per-country subtypes. Endpoints are
//! explicit descriptors carrying their own cacheability, registered in a
//! fixed table rather than discovered.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};

use crate::cache::{CacheLayer, Params};
use crate::engine::stylized::StylizedEngine;
use crate::engine::TaxBenefitEngine;
use crate::error::{DispatchError, EngineError};
use crate::metrics::{self, ResultsConfig};
use crate::model::{Reform, Situation};
use crate::reform::ParamReformBuilder;
use crate::runner::SimulationRunner;

/// Everything that differs between jurisdictions.
#[derive(Debug, Clone)]
pub struct CountryConfig {
    /// URL segment, e.g. "uk".
    pub name: String,
    /// Reform applied under both scenarios (current-law corrections).
    pub default_reform: Reform,
    pub results: ResultsConfig,
    /// Payload for the `default-household` endpoint.
    pub default_household: Value,
    /// Entity-hierarchy payload for the `entities` endpoint.
    pub entity_hierarchy: Value,
}

impl CountryConfig {
    #[must_use]
    pub fn uk() -> Self {
        Self::stylized("uk", 30_000.0)
    }

    #[must_use]
    pub fn us() -> Self {
        Self::stylized("us", 45_000.0)
    }

    fn stylized(name: &str, default_income: f64) -> Self {
        Self {
            name: name.to_string(),
            default_reform: Reform::identity(),
            results: ResultsConfig::default(),
            default_household: json!({
                "people": {
                    "adult": { "age": 35, "employment_income": default_income },
                    "child": { "age": 8, "employment_income": 0 },
                }
            }),
            entity_hierarchy: json!({ "household": ["person"] }),
        }
    }
}

type EndpointFn = fn(&Country, &Params) -> Result<Value, DispatchError>;

/// Explicit endpoint capability descriptor. Cacheability travels with
/// the handler, not with a registry-level list.
pub struct Endpoint {
    pub name: &'static str,
    pub cacheable: bool,
    invoke: EndpointFn,
}

impl Endpoint {
    /// Endpoint name as mounted in URLs (underscores become hyphens).
    #[must_use]
    pub fn route_name(&self) -> String {
        self.name.replace('_', "-")
    }
}

/// One configured jurisdiction: engine, process-lifetime baseline, and
/// the fixed endpoint table. Built once at startup; read-only afterwards.
pub struct Country {
    name: String,
    runner: SimulationRunner,
    results: ResultsConfig,
    default_household: Value,
    parameters_payload: Value,
    variables_payload: Value,
    entities_payload: Value,
    endpoints: Vec<Endpoint>,
}

impl Country {
    pub fn new(
        config: CountryConfig,
        engine: Arc<dyn TaxBenefitEngine>,
    ) -> Result<Self, EngineError> {
        let parameters_payload = to_value(engine.parameters())?;
        let variables_payload = to_value(engine.variables())?;
        let entities_payload = json!({
            "entities": {
                "person": { "label": "Person", "plural": "people" },
                "household": { "label": "Household", "plural": "households" },
            },
            "hierarchy": config.entity_hierarchy,
        });
        let runner = SimulationRunner::new(engine, config.default_reform)?;
        Ok(Self {
            name: config.name,
            runner,
            results: config.results,
            default_household: config.default_household,
            parameters_payload,
            variables_payload,
            entities_payload,
            endpoints: endpoint_table(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Resolve an endpoint by its hyphenated route name.
    #[must_use]
    pub fn endpoint(&self, route_name: &str) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|ep| ep.route_name() == route_name)
    }

    fn reform_builder(&self) -> ParamReformBuilder<'_> {
        ParamReformBuilder::new(self.runner.engine().parameters())
    }

    fn population_reform(&self, params: &Params) -> Result<Value, DispatchError> {
        let reform = self.reform_builder().build(params)?;
        let reformed = self.runner.reformed_population(&reform)?;
        let response =
            metrics::population_reform(self.runner.baseline(), reformed.as_ref(), &self.results)?;
        to_value(&response).map_err(Into::into)
    }

    fn household_reform(&self, params: &Params) -> Result<Value, DispatchError> {
        // Structured audit of the submitted household, replacing the
        // old write-to-local-file behavior.
        tracing::info!(country = %self.name, "household reform requested");
        let situation =
            Situation::from_value(params.get("household"), self.runner.engine().variables())?;
        let reform = self.reform_builder().build(params)?;
        let quad = self.runner.household_with_perturbation(
            &situation,
            &reform,
            &self.results.earnings_variable,
            1.0,
        )?;
        let response = metrics::household_reform(&quad, &self.results)?;
        to_value(&response).map_err(Into::into)
    }

    fn ubi(&self, params: &Params) -> Result<Value, DispatchError> {
        let reform = self.reform_builder().build(params)?;
        let reformed = self.runner.reformed_population(&reform)?;
        let amount = metrics::ubi(self.runner.baseline(), reformed.as_ref(), &self.results)?;
        Ok(json!({ "UBI": amount }))
    }

    fn population_breakdown(&self, params: &Params) -> Result<Value, DispatchError> {
        let (reform, provisions) = self.reform_builder().build_with_descriptions(params)?;
        let response =
            metrics::breakdown_per_provision(&self.runner, &reform, &provisions, &self.results)?;
        to_value(&response).map_err(Into::into)
    }

    fn parameters(&self, _params: &Params) -> Result<Value, DispatchError> {
        Ok(self.parameters_payload.clone())
    }

    fn variables(&self, _params: &Params) -> Result<Value, DispatchError> {
        Ok(self.variables_payload.clone())
    }

    fn entities(&self, _params: &Params) -> Result<Value, DispatchError> {
        Ok(self.entities_payload.clone())
    }

    fn default_household(&self, _params: &Params) -> Result<Value, DispatchError> {
        Ok(self.default_household.clone())
    }
}

/// The fixed endpoint set every country exposes. Static reference reads
/// and the debug-oriented household endpoint opt out of caching.
fn endpoint_table() -> Vec<Endpoint> {
    let ep = |name: &'static str, cacheable: bool, invoke: EndpointFn| Endpoint {
        name,
        cacheable,
        invoke,
    };
    vec![
        ep("population_reform", true, Country::population_reform),
        ep("household_reform", false, Country::household_reform),
        ep("ubi", true, Country::ubi),
        ep("population_breakdown", true, Country::population_breakdown),
        ep("parameters", false, Country::parameters),
        ep("variables", false, Country::variables),
        ep("entities", false, Country::entities),
        ep("default_household", false, Country::default_household),
    ]
}

fn to_value<T: Serialize>(value: T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::Computation(e.to_string()))
}

/// All configured countries plus the cache layer: the dispatch surface
/// the HTTP router mounts.
pub struct CountryRegistry {
    countries: BTreeMap<String, Country>,
    cache: CacheLayer,
}

impl CountryRegistry {
    #[must_use]
    pub fn new(cache: CacheLayer) -> Self {
        Self {
            countries: BTreeMap::new(),
            cache,
        }
    }

    /// Registry over the bundled stylized countries.
    pub fn bundled(cache: CacheLayer) -> Result<Self, EngineError> {
        let mut registry = Self::new(cache);
        registry.register(Country::new(
            CountryConfig::uk(),
            Arc::new(StylizedEngine::uk()),
        )?);
        registry.register(Country::new(
            CountryConfig::us(),
            Arc::new(StylizedEngine::us()),
        )?);
        Ok(registry)
    }

    pub fn register(&mut self, country: Country) {
        self.countries.insert(country.name().to_string(), country);
    }

    #[must_use]
    pub fn country(&self, name: &str) -> Option<&Country> {
        self.countries.get(name)
    }

    pub fn country_names(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    /// Resolve and execute one request, consulting the cache for
    /// cacheable endpoints. Cache writes are idempotent: the pipeline is
    /// deterministic, so duplicate writes carry identical payloads.
    pub fn dispatch(
        &self,
        country: &str,
        endpoint: &str,
        params: &Params,
    ) -> Result<Value, DispatchError> {
        let target = self
            .countries
            .get(country)
            .ok_or_else(|| DispatchError::UnknownCountry(country.to_string()))?;
        let descriptor =
            target
                .endpoint(endpoint)
                .ok_or_else(|| DispatchError::UnknownEndpoint {
                    country: country.to_string(),
                    endpoint: endpoint.to_string(),
                })?;

        if descriptor.cacheable
            && let Some(hit) = self.cache.get(country, descriptor.name, params)
        {
            tracing::debug!(country, endpoint, "cache hit");
            return Ok(hit);
        }

        let payload = (descriptor.invoke)(target, params)?;
        if descriptor.cacheable {
            self.cache.put(country, descriptor.name, params, &payload);
        }
        Ok(payload)
    }
}
