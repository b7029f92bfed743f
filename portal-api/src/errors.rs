use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use points::PointsError;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Points(#[from] PointsError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .collect();
        if messages.is_empty() {
            ApiError::BadRequest(errors.to_string())
        } else {
            ApiError::BadRequest(messages.join(", "))
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Points(PointsError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Points(PointsError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Points(PointsError::SessionNotFound) => StatusCode::NOT_FOUND,
            ApiError::Points(PointsError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Points(PointsError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Points(PointsError::Corrupt(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("Request failed: {:?}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(json!({ "error": message }))
    }
}
