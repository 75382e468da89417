//! Reforms: ordered, composable sets of parameter overrides.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::model::params::ParamValue;

/// One atomic change to a baseline parameter, optionally windowed to an
/// effective-date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterOverride {
    pub path: String,
    pub value: ParamValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Date>,
}

impl ParameterOverride {
    #[must_use]
    pub fn new(path: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            start: None,
            end: None,
        }
    }

    /// Whether the override is in force at any point during `year`.
    #[must_use]
    pub fn applies_in(&self, year: i16) -> bool {
        let year_start = Date::constant(year, 1, 1);
        let year_end = Date::constant(year, 12, 31);
        let after_start = self.start.is_none_or(|s| s <= year_end);
        let before_end = self.end.is_none_or(|e| e >= year_start);
        after_start && before_end
    }
}

/// An ordered composition of parameter overrides.
///
/// Composition is associative; entries sharing a path are order-sensitive
/// and the later entry wins when applied. The empty reform is the
/// identity: applying it leaves every baseline value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reform {
    overrides: Vec<ParameterOverride>,
}

impl Reform {
    /// The identity reform.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_overrides(overrides: Vec<ParameterOverride>) -> Self {
        Self { overrides }
    }

    pub fn push(&mut self, entry: ParameterOverride) {
        self.overrides.push(entry);
    }

    /// `self ∘ other`: apply `self` first, then `other` on top. Later
    /// entries win for overlapping paths.
    #[must_use]
    pub fn compose(mut self, other: Reform) -> Self {
        self.overrides.extend(other.overrides);
        self
    }

    #[must_use]
    pub fn overrides(&self) -> &[ParameterOverride] {
        &self.overrides
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.overrides.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Human-readable record of one provision of a reform: what changed,
/// from what, to what. Produced alongside the reform when a
/// breakdown-by-provision is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionDescription {
    pub path: String,
    pub label: String,
    pub before: ParamValue,
    pub after: ParamValue,
}
