//! Building reforms from flat request parameters.

use serde_json::Value;

use crate::cache::Params;
use crate::error::ReformError;
use crate::model::{
    ParamValue, ParameterOverride, ParameterTree, ProvisionDescription, Reform,
};

/// Request keys that are never parameter overrides.
const RESERVED_KEYS: &[&str] = &["household"];

/// Turns a flat override-parameter mapping into a structured [`Reform`].
///
/// Every non-reserved key must resolve against the engine's parameter
/// tree; an unresolvable path fails the whole request rather than being
/// skipped, so a typo'd path cannot silently become a no-op reform.
pub struct ParamReformBuilder<'a> {
    tree: &'a ParameterTree,
}

impl<'a> ParamReformBuilder<'a> {
    #[must_use]
    pub fn new(tree: &'a ParameterTree) -> Self {
        Self { tree }
    }

    /// Build a reform from the request parameters. An empty mapping (or
    /// one with only reserved keys) yields the identity reform.
    pub fn build(&self, params: &Params) -> Result<Reform, ReformError> {
        let mut reform = Reform::identity();
        for (path, raw) in params {
            if RESERVED_KEYS.contains(&path.as_str()) {
                continue;
            }
            reform.push(self.parse_override(path, raw)?);
        }
        Ok(reform)
    }

    /// Like [`build`](Self::build), additionally capturing one
    /// before/after description per resolved override. Before-values are
    /// read from the baseline parameter tree, so no simulation runs.
    pub fn build_with_descriptions(
        &self,
        params: &Params,
    ) -> Result<(Reform, Vec<ProvisionDescription>), ReformError> {
        let reform = self.build(params)?;
        let mut provisions = Vec::with_capacity(reform.len());
        for entry in reform.overrides() {
            // The path resolved during build, so the leaf is present.
            let Some(meta) = self.tree.get(&entry.path) else {
                return Err(ReformError::UnresolvableParameter(entry.path.clone()));
            };
            provisions.push(ProvisionDescription {
                path: entry.path.clone(),
                label: meta.label.clone(),
                before: meta.baseline,
                after: entry.value,
            });
        }
        Ok((reform, provisions))
    }

    fn parse_override(&self, path: &str, raw: &Value) -> Result<ParameterOverride, ReformError> {
        if !self.tree.contains(path) {
            return Err(ReformError::UnresolvableParameter(path.to_string()));
        }
        let mut entry = ParameterOverride::new(path, 0.0);
        match raw {
            Value::Object(fields) => {
                let value = fields
                    .get("value")
                    .ok_or_else(|| ReformError::InvalidValue {
                        path: path.to_string(),
                        value: raw.to_string(),
                    })?;
                entry.value = parse_scalar(path, value)?;
                entry.start = parse_date(path, fields.get("start"))?;
                entry.end = parse_date(path, fields.get("end"))?;
                if let (Some(start), Some(end)) = (entry.start, entry.end)
                    && end < start
                {
                    return Err(ReformError::InvertedDateRange {
                        path: path.to_string(),
                    });
                }
            }
            scalar => entry.value = parse_scalar(path, scalar)?,
        }
        Ok(entry)
    }
}

fn parse_scalar(path: &str, raw: &Value) -> Result<ParamValue, ReformError> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .map(ParamValue::Number)
            .ok_or_else(|| invalid(path, raw)),
        Value::Bool(b) => Ok(ParamValue::Bool(*b)),
        // Query-string values arrive as strings.
        Value::String(s) => {
            if let Ok(x) = s.parse::<f64>() {
                Ok(ParamValue::Number(x))
            } else if let Ok(b) = s.parse::<bool>() {
                Ok(ParamValue::Bool(b))
            } else {
                Err(invalid(path, raw))
            }
        }
        _ => Err(invalid(path, raw)),
    }
}

fn parse_date(
    path: &str,
    raw: Option<&Value>,
) -> Result<Option<jiff::civil::Date>, ReformError> {
    let Some(raw) = raw else { return Ok(None) };
    if raw.is_null() {
        return Ok(None);
    }
    raw.as_str()
        .and_then(|s| s.parse::<jiff::civil::Date>().ok())
        .map(Some)
        .ok_or_else(|| invalid(path, raw))
}

fn invalid(path: &str, raw: &Value) -> ReformError {
    ReformError::InvalidValue {
        path: path.to_string(),
        value: raw.to_string(),
    }
}
