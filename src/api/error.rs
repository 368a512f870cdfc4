use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::optimizer::OptimizerError;
use crate::repo::RepoError;
use crate::smart_charging::SmartChargingError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unprocessable site area data: {0}")]
    Unprocessable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::Unprocessable(_) => "Unprocessable",
            ApiError::InternalError(_) => "InternalServerError",
            ApiError::ServiceUnavailable(_) => "ServiceUnavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        let message = match &self {
            ApiError::InternalError(_) => {
                tracing::error!(error = %self, "API error occurred");
                "An internal error occurred".to_string()
            }
            ApiError::ServiceUnavailable(_) => {
                tracing::warn!(error = %self, "Service unavailable");
                "Optimizer temporarily unavailable".to_string()
            }
            _ => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error_type.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<SmartChargingError> for ApiError {
    fn from(error: SmartChargingError) -> Self {
        match error {
            SmartChargingError::SiteAreaNotFound { .. } => ApiError::NotFound(error.to_string()),
            SmartChargingError::InvalidSiteArea { .. }
            | SmartChargingError::Topology { .. }
            | SmartChargingError::SessionResolution { .. } => {
                ApiError::Unprocessable(error.to_string())
            }
            SmartChargingError::SolverCall { .. } => {
                ApiError::ServiceUnavailable(error.to_string())
            }
            SmartChargingError::Configuration { .. } | SmartChargingError::Storage { .. } => {
                ApiError::InternalError(error.to_string())
            }
        }
    }
}

impl From<OptimizerError> for ApiError {
    fn from(error: OptimizerError) -> Self {
        if error.is_configuration() {
            ApiError::InternalError(error.to_string())
        } else {
            ApiError::ServiceUnavailable(error.to_string())
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound(what) => ApiError::NotFound(what),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}
