//! Household situations: the nested input format describing a single
//! household for individual-level (non-population) evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SituationError;
use crate::model::params::VariableMetadata;

/// One person in a household situation: a name and a flat mapping of
/// input-variable values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationPerson {
    pub name: String,
    pub variables: BTreeMap<String, f64>,
}

/// A single household's structured description.
///
/// The request shape mirrors the front-end format:
///
/// ```json
/// { "people": { "adult": { "age": 35, "employment_income": 30000 } } }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Situation {
    pub people: Vec<SituationPerson>,
}

impl Situation {
    /// Parse and validate the `household` value of a request.
    ///
    /// Unknown variables and non-numeric values are client errors; the
    /// engine is never handed an unvalidated situation.
    pub fn from_value(
        value: Option<&Value>,
        known_variables: &[VariableMetadata],
    ) -> Result<Self, SituationError> {
        let household = value
            .and_then(Value::as_object)
            .ok_or(SituationError::MissingHousehold)?;
        let people = household
            .get("people")
            .and_then(Value::as_object)
            .ok_or_else(|| SituationError::Malformed("missing people mapping".to_string()))?;

        if people.is_empty() {
            return Err(SituationError::EmptyHousehold);
        }

        let mut out = Vec::with_capacity(people.len());
        for (name, entry) in people {
            let fields = entry.as_object().ok_or_else(|| {
                SituationError::Malformed(format!("person {name:?} is not an object"))
            })?;
            let mut variables = BTreeMap::new();
            for (variable, raw) in fields {
                let known = known_variables
                    .iter()
                    .any(|meta| meta.is_input && meta.name == *variable);
                if !known {
                    return Err(SituationError::UnknownVariable {
                        person: name.clone(),
                        variable: variable.clone(),
                    });
                }
                let value = raw.as_f64().ok_or_else(|| {
                    SituationError::Malformed(format!(
                        "value of {variable:?} for person {name:?} is not numeric"
                    ))
                })?;
                variables.insert(variable.clone(), value);
            }
            out.push(SituationPerson {
                name: name.clone(),
                variables,
            });
        }

        Ok(Situation { people: out })
    }
}
