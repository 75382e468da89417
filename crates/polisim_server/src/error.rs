use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use polisim_core::error::DispatchError;

/// Custom error types for the PoliSim API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("request body must be a JSON object")]
    BadBody,

    #[error("internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::Dispatch(e) => match e {
                DispatchError::UnknownCountry(_) | DispatchError::UnknownEndpoint { .. } => {
                    (StatusCode::NOT_FOUND, self.to_string())
                }
                DispatchError::Reform(_) | DispatchError::Situation(_) => {
                    (StatusCode::BAD_REQUEST, self.to_string())
                }
                // Engine failures surface with their message preserved.
                DispatchError::Engine(_) => {
                    tracing::error!(error = %self, "engine computation failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
                }
            },

            ApiError::BadBody => (StatusCode::BAD_REQUEST, self.to_string()),

            ApiError::Internal => {
                tracing::error!(error = %self, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Helper type for API results
pub type ApiResult<T> = Result<T, ApiError>;
