//! The engine's parameter tree, as exposed to reform building and to the
//! `parameters` endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A scalar policy parameter value.
///
/// Query-string values arrive as strings and are type-normalized before
/// they reach this type; see `cache::normalize_params`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Bool(bool),
}

impl ParamValue {
    /// Numeric view; booleans read as 0/1 so masks can be arithmetic.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Number(x) => *x,
            ParamValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Number(x)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// Metadata for one leaf of the parameter tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterMeta {
    /// Human-readable label, e.g. "Income tax basic rate".
    pub label: String,
    /// Display unit: "/1" for rates, "currency" for money amounts.
    pub unit: String,
    /// Baseline value before any reform is applied.
    pub baseline: ParamValue,
}

/// Flattened parameter tree: dotted path to leaf metadata.
///
/// Paths are the namespace reforms resolve against; an override naming a
/// path absent from this tree is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterTree {
    leaves: BTreeMap<String, ParameterMeta>,
}

impl ParameterTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, meta: ParameterMeta) {
        self.leaves.insert(path.into(), meta);
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ParameterMeta> {
        self.leaves.get(path)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.leaves.contains_key(path)
    }

    /// Baseline value of a leaf, if the path resolves.
    #[must_use]
    pub fn baseline(&self, path: &str) -> Option<ParamValue> {
        self.leaves.get(path).map(|meta| meta.baseline)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterMeta)> {
        self.leaves.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

/// Entity level a variable is defined (or mapped) at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Person,
    Household,
}

impl Entity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Person => "person",
            Entity::Household => "household",
        }
    }
}

/// Metadata for one engine variable, served by the `variables` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableMetadata {
    pub name: String,
    pub entity: Entity,
    pub label: String,
    pub unit: String,
    /// Whether the variable is a direct input (settable via `set_input`)
    /// rather than a computed output.
    pub is_input: bool,
}
