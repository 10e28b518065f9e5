//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::controller::SosError;

/// Structured error response body for the views.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No active SOS request")]
    NoActiveRequest,
    #[error("Doctor is offline")]
    DoctorOffline,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NoActiveRequest => (
                StatusCode::CONFLICT,
                "NO_ACTIVE_REQUEST",
                "There is no active SOS request to act on".to_string(),
            ),
            ApiError::DoctorOffline => (
                StatusCode::CONFLICT,
                "DOCTOR_OFFLINE",
                "Go online before accepting requests".to_string(),
            ),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<SosError> for ApiError {
    fn from(err: SosError) -> Self {
        match err {
            SosError::NoActiveRequest => ApiError::NoActiveRequest,
            SosError::DoctorOffline => ApiError::DoctorOffline,
            SosError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
        }
    }
}
