//! Maps [`WatchError`] onto the REST surface's `{success, code, message}`
//! envelope and HTTP status codes, per the error-handling contract.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use sitewatch_core::errors::{ErrorKind, WatchError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
}

pub struct ApiError(pub WatchError);

impl From<WatchError> for ApiError {
    fn from(err: WatchError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyInitialized | ErrorKind::TargetLocked => StatusCode::CONFLICT,
            ErrorKind::Validation | ErrorKind::OversizedInput => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::StorageFailure | ErrorKind::RenderUnavailable => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorKind::EnrichmentFailure
            | ErrorKind::Io
            | ErrorKind::Serialization
            | ErrorKind::DeterminismViolation
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self
            .0
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| self.0.to_string());
        let body = ErrorBody {
            success: false,
            code: self.0.code(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
