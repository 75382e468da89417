//! The single generic endpoint handler: every country/endpoint request
//! goes through parameter merging and registry dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::Value;

use polisim_core::cache::{Params, normalize_params};
use polisim_core::country::CountryRegistry;

use crate::error::{ApiError, ApiResult};

/// Merge query-string and JSON-body parameters into one flat mapping.
/// Body keys override query keys on conflict; all values are
/// type-normalized so both sources hash and parse identically.
pub fn merge_params(query: HashMap<String, String>, body: Option<Value>) -> ApiResult<Params> {
    let mut params: Params = query
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    match body {
        None | Some(Value::Null) => {}
        Some(Value::Object(fields)) => {
            for (key, value) in fields {
                params.insert(key, value);
            }
        }
        Some(_) => return Err(ApiError::BadBody),
    }
    Ok(normalize_params(params))
}

/// `GET|POST /{country}/api/{endpoint}`. Simulation work is CPU-bound
/// and runs on the blocking pool.
pub async fn dispatch(
    State(registry): State<Arc<CountryRegistry>>,
    Path((country, endpoint)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> ApiResult<Json<Value>> {
    let params = merge_params(query, body.map(|Json(v)| v))?;
    let payload =
        tokio::task::spawn_blocking(move || registry.dispatch(&country, &endpoint, &params))
            .await
            .map_err(|_| ApiError::Internal)??;
    Ok(Json(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_overrides_query_on_conflict() {
        let query = HashMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        let body = json!({ "a": 9 });
        let params = merge_params(query, Some(body)).unwrap();
        assert_eq!(params["a"], json!(9.0));
        assert_eq!(params["b"], json!(2.0));
    }

    #[test]
    fn query_strings_are_type_normalized() {
        let query = HashMap::from([
            ("rate".to_string(), "0.25".to_string()),
            ("flag".to_string(), "true".to_string()),
            ("name".to_string(), "adult".to_string()),
        ]);
        let params = merge_params(query, None).unwrap();
        assert_eq!(params["rate"], json!(0.25));
        assert_eq!(params["flag"], json!(true));
        assert_eq!(params["name"], json!("adult"));
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(merge_params(HashMap::new(), Some(json!([1, 2]))).is_err());
        assert!(merge_params(HashMap::new(), Some(Value::Null)).is_ok());
    }
}
