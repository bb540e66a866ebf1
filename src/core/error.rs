use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use super::types::ErrorResponse;

/// Caller-facing error taxonomy. Engine and widget failures are recovered
/// locally and never reach this type; only validation, not-found, and
/// unexpected faults propagate to the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing required parameter: {0}")]
    MissingParam(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("internal error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParam(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Unexpected(_)) {
            tracing::error!("unhandled error: {}", self);
        }
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_param_message_is_stable() {
        let e = ApiError::MissingParam("q");
        assert_eq!(e.to_string(), "Missing required parameter: q");
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            ApiError::NotFound("knowledge panel".into()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
