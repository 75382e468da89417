//! Stylized reference engine: a small deterministic tax/benefit
//! calculator over an in-memory synthetic dataset.
//!
//! Rules are deliberately simple (progressive income tax with a personal
//! allowance and a higher band, a per-child benefit, an optional flat
//! basic income, household poverty lines). The point is to exercise the
//! reform/simulation/metrics pipeline end to end, not to model any real
//! jurisdiction faithfully.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::engine::{Simulation, SweepPoint, TaxBenefitEngine};
use crate::error::EngineError;
use crate::model::{
    Entity, ParamValue, ParameterMeta, ParameterTree, Reform, Situation, VariableMetadata,
};

pub const P_BASIC_RATE: &str = "tax.income_tax.basic_rate";
pub const P_HIGHER_RATE: &str = "tax.income_tax.higher_rate";
pub const P_HIGHER_THRESHOLD: &str = "tax.income_tax.higher_threshold";
pub const P_PERSONAL_ALLOWANCE: &str = "tax.income_tax.personal_allowance";
pub const P_CHILD_BENEFIT: &str = "benefit.child_benefit.amount";
pub const P_BASIC_INCOME: &str = "benefit.basic_income.amount";
pub const P_POVERTY_LINE: &str = "poverty.poverty_line";
pub const P_DEEP_POVERTY_LINE: &str = "poverty.deep_poverty_line";

/// One person of the synthetic dataset.
#[derive(Debug, Clone)]
pub struct PersonRecord {
    pub age: f64,
    pub employment_income: f64,
}

#[derive(Debug, Clone)]
pub struct HouseholdRecord {
    pub people: Vec<PersonRecord>,
}

/// In-memory microdata: the population a simulation evaluates over.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub households: Vec<HouseholdRecord>,
}

/// Resolved policy values for one simulation period.
#[derive(Debug, Clone, Copy)]
struct PolicyParams {
    basic_rate: f64,
    higher_rate: f64,
    higher_threshold: f64,
    personal_allowance: f64,
    child_benefit: f64,
    basic_income: f64,
    poverty_line: f64,
    deep_poverty_line: f64,
}

impl PolicyParams {
    fn from_tree(tree: &ParameterTree, reform: &Reform, year: i16) -> Result<Self, EngineError> {
        let baseline = |path: &str| -> Result<f64, EngineError> {
            tree.baseline(path)
                .map(|v| v.as_f64())
                .ok_or_else(|| EngineError::Computation(format!("parameter {path} not in tree")))
        };
        let mut params = PolicyParams {
            basic_rate: baseline(P_BASIC_RATE)?,
            higher_rate: baseline(P_HIGHER_RATE)?,
            higher_threshold: baseline(P_HIGHER_THRESHOLD)?,
            personal_allowance: baseline(P_PERSONAL_ALLOWANCE)?,
            child_benefit: baseline(P_CHILD_BENEFIT)?,
            basic_income: baseline(P_BASIC_INCOME)?,
            poverty_line: baseline(P_POVERTY_LINE)?,
            deep_poverty_line: baseline(P_DEEP_POVERTY_LINE)?,
        };
        // Overrides apply in reform order; later entries win.
        for entry in reform.overrides() {
            if !entry.applies_in(year) {
                continue;
            }
            let value = entry.value.as_f64();
            match entry.path.as_str() {
                P_BASIC_RATE => params.basic_rate = value,
                P_HIGHER_RATE => params.higher_rate = value,
                P_HIGHER_THRESHOLD => params.higher_threshold = value,
                P_PERSONAL_ALLOWANCE => params.personal_allowance = value,
                P_CHILD_BENEFIT => params.child_benefit = value,
                P_BASIC_INCOME => params.basic_income = value,
                P_POVERTY_LINE => params.poverty_line = value,
                P_DEEP_POVERTY_LINE => params.deep_poverty_line = value,
                other => {
                    return Err(EngineError::Computation(format!(
                        "parameter {other} is not wired into the stylized rules"
                    )));
                }
            }
        }
        Ok(params)
    }
}

fn leaf(label: &str, unit: &str, baseline: f64) -> ParameterMeta {
    ParameterMeta {
        label: label.to_string(),
        unit: unit.to_string(),
        baseline: ParamValue::Number(baseline),
    }
}

fn variable_catalogue() -> Vec<VariableMetadata> {
    let var = |name: &str, entity: Entity, label: &str, unit: &str, is_input: bool| {
        VariableMetadata {
            name: name.to_string(),
            entity,
            label: label.to_string(),
            unit: unit.to_string(),
            is_input,
        }
    };
    vec![
        var(
            "employment_income",
            Entity::Person,
            "Employment income",
            "currency",
            true,
        ),
        var("age", Entity::Person, "Age", "year", true),
        var("tax", Entity::Person, "Income tax", "currency", false),
        var("benefits", Entity::Person, "Benefits", "currency", false),
        var("net_income", Entity::Person, "Net income", "currency", false),
        var("people", Entity::Person, "People", "/1", false),
        var("is_adult", Entity::Person, "Is an adult", "/1", false),
        var("is_child", Entity::Person, "Is a child", "/1", false),
        var("is_senior", Entity::Person, "Is a senior", "/1", false),
        var(
            "decile",
            Entity::Person,
            "Household income decile",
            "/1",
            false,
        ),
        var(
            "household_net_income",
            Entity::Household,
            "Household net income",
            "currency",
            false,
        ),
        var("in_poverty", Entity::Household, "In poverty", "/1", false),
        var(
            "in_deep_poverty",
            Entity::Household,
            "In deep poverty",
            "/1",
            false,
        ),
    ]
}

/// The bundled engine: parameter tree + variable catalogue + dataset.
pub struct StylizedEngine {
    parameters: ParameterTree,
    variables: Vec<VariableMetadata>,
    dataset: Dataset,
    year: i16,
}

impl StylizedEngine {
    #[must_use]
    pub fn new(parameters: ParameterTree, dataset: Dataset, year: i16) -> Self {
        Self {
            parameters,
            variables: variable_catalogue(),
            dataset,
            year,
        }
    }

    /// Stylized UK: 2025 income-tax bands, child benefit, no basic income.
    #[must_use]
    pub fn uk() -> Self {
        let mut tree = ParameterTree::new();
        tree.insert(P_BASIC_RATE, leaf("Income tax basic rate", "/1", 0.20));
        tree.insert(P_HIGHER_RATE, leaf("Income tax higher rate", "/1", 0.40));
        tree.insert(
            P_HIGHER_THRESHOLD,
            leaf("Higher rate threshold", "currency", 50_270.0),
        );
        tree.insert(
            P_PERSONAL_ALLOWANCE,
            leaf("Personal allowance", "currency", 12_570.0),
        );
        tree.insert(
            P_CHILD_BENEFIT,
            leaf("Child benefit per child", "currency", 1_331.0),
        );
        tree.insert(
            P_BASIC_INCOME,
            leaf("Basic income per person", "currency", 0.0),
        );
        tree.insert(
            P_POVERTY_LINE,
            leaf("Poverty line per person", "currency", 14_000.0),
        );
        tree.insert(
            P_DEEP_POVERTY_LINE,
            leaf("Deep poverty line per person", "currency", 7_000.0),
        );
        Self::new(tree, synthetic_dataset(120, 900.0), 2025)
    }

    /// Stylized US: wider brackets, a child credit paid as a benefit.
    #[must_use]
    pub fn us() -> Self {
        let mut tree = ParameterTree::new();
        tree.insert(P_BASIC_RATE, leaf("Income tax basic rate", "/1", 0.12));
        tree.insert(P_HIGHER_RATE, leaf("Income tax higher rate", "/1", 0.32));
        tree.insert(
            P_HIGHER_THRESHOLD,
            leaf("Higher rate threshold", "currency", 95_375.0),
        );
        tree.insert(
            P_PERSONAL_ALLOWANCE,
            leaf("Standard deduction", "currency", 13_850.0),
        );
        tree.insert(
            P_CHILD_BENEFIT,
            leaf("Child tax credit per child", "currency", 2_000.0),
        );
        tree.insert(
            P_BASIC_INCOME,
            leaf("Basic income per person", "currency", 0.0),
        );
        tree.insert(
            P_POVERTY_LINE,
            leaf("Poverty line per person", "currency", 15_000.0),
        );
        tree.insert(
            P_DEEP_POVERTY_LINE,
            leaf("Deep poverty line per person", "currency", 7_500.0),
        );
        Self::new(tree, synthetic_dataset(150, 1_100.0), 2025)
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

/// Deterministic synthetic microdata: an income grid with a mix of
/// household shapes (singles, couples, children, seniors).
#[must_use]
pub fn synthetic_dataset(households: usize, income_step: f64) -> Dataset {
    let mut out = Vec::with_capacity(households);
    for i in 0..households {
        let income = income_step * i as f64;
        let mut people = vec![PersonRecord {
            age: if i % 7 == 0 { 70.0 } else { 38.0 },
            employment_income: income,
        }];
        if i % 5 == 0 {
            // Second adult on a lower income.
            people.push(PersonRecord {
                age: 36.0,
                employment_income: income * 0.4,
            });
        }
        if i % 3 == 0 {
            people.push(PersonRecord {
                age: 9.0,
                employment_income: 0.0,
            });
        }
        if i % 6 == 0 {
            people.push(PersonRecord {
                age: 13.0,
                employment_income: 0.0,
            });
        }
        out.push(HouseholdRecord { people });
    }
    Dataset { households: out }
}

impl TaxBenefitEngine for StylizedEngine {
    fn parameters(&self) -> &ParameterTree {
        &self.parameters
    }

    fn variables(&self) -> &[VariableMetadata] {
        &self.variables
    }

    fn population_simulation(&self, reform: &Reform) -> Result<Box<dyn Simulation>, EngineError> {
        let policy = PolicyParams::from_tree(&self.parameters, reform, self.year)?;
        tracing::debug!(
            year = self.year,
            households = self.dataset.households.len(),
            overrides = reform.len(),
            "building population simulation"
        );
        Ok(Box::new(StylizedSimulation::new(
            policy,
            self.dataset.households.clone(),
            self.year,
        )))
    }

    fn household_simulation(
        &self,
        situation: &Situation,
        reform: &Reform,
    ) -> Result<Box<dyn Simulation>, EngineError> {
        let policy = PolicyParams::from_tree(&self.parameters, reform, self.year)?;
        let people = situation
            .people
            .iter()
            .map(|person| PersonRecord {
                age: person.variables.get("age").copied().unwrap_or(40.0),
                employment_income: person
                    .variables
                    .get("employment_income")
                    .copied()
                    .unwrap_or(0.0),
            })
            .collect();
        let household = HouseholdRecord { people };
        tracing::debug!(
            year = self.year,
            people = household.people.len(),
            overrides = reform.len(),
            "building household simulation"
        );
        Ok(Box::new(StylizedSimulation::new(
            policy,
            vec![household],
            self.year,
        )))
    }
}

fn bool_to_f64(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// A concrete simulation: resolved policy + microdata + forced inputs.
pub struct StylizedSimulation {
    policy: PolicyParams,
    households: Vec<HouseholdRecord>,
    /// Person-level inputs forced via `set_input`, replacing the dataset.
    forced: FxHashMap<String, Vec<f64>>,
    /// Person index -> household index.
    household_of: Vec<usize>,
    household_sizes: Vec<usize>,
    year: i16,
}

impl StylizedSimulation {
    fn new(policy: PolicyParams, households: Vec<HouseholdRecord>, year: i16) -> Self {
        let mut household_of = Vec::new();
        let mut household_sizes = Vec::with_capacity(households.len());
        for (h, household) in households.iter().enumerate() {
            household_sizes.push(household.people.len());
            for _ in &household.people {
                household_of.push(h);
            }
        }
        Self {
            policy,
            households,
            forced: FxHashMap::default(),
            household_of,
            household_sizes,
            year,
        }
    }

    fn person_count(&self) -> usize {
        self.household_of.len()
    }

    fn employment_income(&self) -> Vec<f64> {
        if let Some(forced) = self.forced.get("employment_income") {
            return forced.clone();
        }
        self.households
            .iter()
            .flat_map(|h| h.people.iter().map(|p| p.employment_income))
            .collect()
    }

    fn age(&self) -> Vec<f64> {
        if let Some(forced) = self.forced.get("age") {
            return forced.clone();
        }
        self.households
            .iter()
            .flat_map(|h| h.people.iter().map(|p| p.age))
            .collect()
    }

    fn income_tax(&self, income: f64) -> f64 {
        let p = &self.policy;
        let taxable = (income - p.personal_allowance).max(0.0);
        let basic_band = (p.higher_threshold - p.personal_allowance).max(0.0);
        let basic = taxable.min(basic_band) * p.basic_rate;
        let higher = (taxable - basic_band).max(0.0) * p.higher_rate;
        basic + higher
    }

    fn tax(&self) -> Vec<f64> {
        self.employment_income()
            .iter()
            .map(|&income| self.income_tax(income))
            .collect()
    }

    fn benefits(&self) -> Vec<f64> {
        let ages = self.age();
        ages.iter()
            .map(|&age| {
                let child = if age < 18.0 {
                    self.policy.child_benefit
                } else {
                    0.0
                };
                child + self.policy.basic_income
            })
            .collect()
    }

    fn net_income(&self) -> Vec<f64> {
        let incomes = self.employment_income();
        let taxes = self.tax();
        let benefits = self.benefits();
        incomes
            .iter()
            .zip(&taxes)
            .zip(&benefits)
            .map(|((income, tax), benefit)| income - tax + benefit)
            .collect()
    }

    fn sum_to_household(&self, person_values: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.households.len()];
        for (value, &h) in person_values.iter().zip(&self.household_of) {
            out[h] += value;
        }
        out
    }

    fn household_net_income(&self) -> Vec<f64> {
        self.sum_to_household(&self.net_income())
    }

    fn in_poverty(&self, line_per_person: f64) -> Vec<f64> {
        self.household_net_income()
            .iter()
            .zip(&self.household_sizes)
            .map(|(&net, &size)| {
                if net < line_per_person * size as f64 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Person-level decile of per-capita household net income, 1..=10.
    fn decile(&self) -> Vec<f64> {
        let hh_net = self.household_net_income();
        let n = hh_net.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            let pa = hh_net[a] / self.household_sizes[a] as f64;
            let pb = hh_net[b] / self.household_sizes[b] as f64;
            pa.partial_cmp(&pb).unwrap_or(Ordering::Equal)
        });
        let mut hh_decile = vec![0.0; n];
        for (rank, &h) in order.iter().enumerate() {
            hh_decile[h] = (rank * 10 / n) as f64 + 1.0;
        }
        self.household_of.iter().map(|&h| hh_decile[h]).collect()
    }

    /// (native values, native entity) for one variable.
    fn native(&self, variable: &str) -> Result<(Vec<f64>, Entity), EngineError> {
        let ages = || self.age();
        let values = match variable {
            "employment_income" => (self.employment_income(), Entity::Person),
            "age" => (ages(), Entity::Person),
            "tax" => (self.tax(), Entity::Person),
            "benefits" => (self.benefits(), Entity::Person),
            "net_income" => (self.net_income(), Entity::Person),
            "people" => (vec![1.0; self.person_count()], Entity::Person),
            "is_adult" => (
                ages().iter().map(|&a| bool_to_f64(a >= 18.0)).collect(),
                Entity::Person,
            ),
            "is_child" => (
                ages().iter().map(|&a| bool_to_f64(a < 18.0)).collect(),
                Entity::Person,
            ),
            "is_senior" => (
                ages().iter().map(|&a| bool_to_f64(a >= 65.0)).collect(),
                Entity::Person,
            ),
            "decile" => (self.decile(), Entity::Person),
            "household_net_income" => (self.household_net_income(), Entity::Household),
            "in_poverty" => (self.in_poverty(self.policy.poverty_line), Entity::Household),
            "in_deep_poverty" => (
                self.in_poverty(self.policy.deep_poverty_line),
                Entity::Household,
            ),
            other => return Err(EngineError::UnknownVariable(other.to_string())),
        };
        Ok(values)
    }
}

impl Simulation for StylizedSimulation {
    fn calc(&self, variable: &str, map_to: Option<Entity>) -> Result<Vec<f64>, EngineError> {
        let (values, entity) = self.native(variable)?;
        let Some(target) = map_to else {
            return Ok(values);
        };
        match (entity, target) {
            (a, b) if a == b => Ok(values),
            // Person values aggregate to household totals.
            (Entity::Person, Entity::Household) => Ok(self.sum_to_household(&values)),
            // Household values broadcast to every member.
            (Entity::Household, Entity::Person) => Ok(self
                .household_of
                .iter()
                .map(|&h| values[h])
                .collect()),
            _ => Err(EngineError::BadEntityMapping {
                variable: variable.to_string(),
                entity: target.as_str(),
            }),
        }
    }

    fn set_input(&mut self, variable: &str, year: i16, values: Vec<f64>) -> Result<(), EngineError> {
        if year != self.year {
            return Err(EngineError::Computation(format!(
                "period {year} outside simulation year {}",
                self.year
            )));
        }
        match variable {
            "employment_income" | "age" => {}
            other => {
                return Err(EngineError::Computation(format!(
                    "variable {other:?} is not an input"
                )));
            }
        }
        if values.len() != self.person_count() {
            return Err(EngineError::Computation(format!(
                "expected {} values for {variable:?}, got {}",
                self.person_count(),
                values.len()
            )));
        }
        self.forced.insert(variable.to_string(), values);
        Ok(())
    }

    fn vary(
        &self,
        variable: &str,
        target: &str,
        step: f64,
        upper: f64,
    ) -> Result<Vec<SweepPoint>, EngineError> {
        if step <= 0.0 {
            return Err(EngineError::Computation(format!(
                "sweep step must be positive, got {step}"
            )));
        }
        let ages = self.age();
        let base_inputs = match variable {
            "employment_income" => self.employment_income(),
            other => {
                return Err(EngineError::Computation(format!(
                    "variable {other:?} cannot be swept"
                )));
            }
        };
        let mut points = Vec::new();
        let mut x = 0.0;
        while x <= upper + step * 0.5 {
            // Sweep forces every adult's earnings; children keep theirs.
            let forced: Vec<f64> = base_inputs
                .iter()
                .zip(&ages)
                .map(|(&income, &age)| if age >= 18.0 { x } else { income })
                .collect();
            let mut probe = StylizedSimulation::new(self.policy, self.households.clone(), self.year);
            probe.forced = self.forced.clone();
            probe.forced.insert(variable.to_string(), forced);
            let output = probe.calc(target, None)?.iter().sum();
            points.push(SweepPoint { input: x, output });
            x += step;
        }
        Ok(points)
    }

    fn year(&self) -> i16 {
        self.year
    }
}
