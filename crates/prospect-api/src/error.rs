//! HTTP error mapping.

use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use tracing::error;

use prospect_core::Error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    /// The automation tool refused or never answered a trigger.
    BadGateway(String),
    /// A required setting is missing.
    Unavailable(String),
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::SearchNotFound(id) => ApiError::NotFound(format!("search {} not found", id)),
            Error::LeadNotFound(id) => ApiError::NotFound(format!("lead {} not found", id)),
            Error::InvalidTransition(msg) | Error::Conflict(msg) => ApiError::Conflict(msg),
            err @ Error::Trigger { .. } => ApiError::BadGateway(err.to_string()),
            Error::Config(msg) => ApiError::Unavailable(msg),
            other => ApiError::Internal(other),
        }
    }
}

/// Malformed, mistyped or mislabeled JSON bodies are a 400 like any other
/// invalid input, in the same error shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(err) => {
                error!(subsystem = "api", error = %err, "Unhandled error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(status_of(Error::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(Error::SearchNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::LeadNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::InvalidTransition("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(Error::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(Error::Trigger {
                search_id: 1,
                message: "timeout".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_of(Error::Config("x".into())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(Error::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
