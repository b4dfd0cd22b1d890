//! HTTP error responses

use crate::models::inference::PredictError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Every failure a request can end with
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", .0.body_text())]
    InvalidInput(#[from] JsonRejection),

    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
}

impl ApiError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::Predict(PredictError::Preprocessing(_)) => "preprocessing",
            ApiError::Predict(PredictError::Inference(_)) => "inference",
            ApiError::ModelUnavailable(_) => "model_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // Missing or wrong-typed fields are 422, malformed JSON 400, wrong content type 415.
            ApiError::InvalidInput(rejection) => rejection.status(),
            ApiError::Predict(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_normalizer::NormalizeError;
    use crate::models::classifier::InferenceError;

    #[test]
    fn test_preprocessing_error_mapping() {
        let err = ApiError::from(PredictError::from(NormalizeError::NonNumeric {
            field: "Age".to_string(),
        }));

        assert_eq!(err.kind(), "preprocessing");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("`Age`"));
    }

    #[test]
    fn test_inference_error_mapping() {
        let err = ApiError::from(PredictError::from(InferenceError::NonFiniteScore {
            model: "lr".to_string(),
        }));

        assert_eq!(err.kind(), "inference");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_model_unavailable_mapping() {
        let err = ApiError::ModelUnavailable("artifact not found: model.json".to_string());

        assert_eq!(err.kind(), "model_unavailable");
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
