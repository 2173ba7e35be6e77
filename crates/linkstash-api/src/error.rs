//! HTTP error mapping.

use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::error;

use linkstash_core::{Error, ErrorKind};

/// Error returned by every handler; renders as `{"error": msg}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(Error),
}

impl ApiError {
    /// Path id that is not an integer.
    pub fn invalid_id() -> Self {
        ApiError::BadRequest("invalid id".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => ApiError::BadRequest(message(err)),
            ErrorKind::NotFound => ApiError::NotFound(message(err)),
            ErrorKind::Conflict => ApiError::Conflict(message(err)),
            ErrorKind::Internal => ApiError::Internal(err),
        }
    }
}

/// Inner message without the variant prefix added by `Display`.
fn message(err: Error) -> String {
    match err {
        Error::InvalidInput(msg) | Error::NotFound(msg) | Error::Conflict(msg) => msg,
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => msg,
            ApiError::Internal(err) => {
                error!(
                    subsystem = "api",
                    component = "error",
                    error = %err,
                    "Request failed"
                );
                "internal server error".to_string()
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kind_to_status() {
        let cases = [
            (Error::InvalidInput("bad url".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("Bookmark 9 not found".into()), StatusCode::NOT_FOUND),
            (Error::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                Error::Timeout(Duration::from_secs(10)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_message_strips_variant_prefix() {
        match ApiError::from(Error::NotFound("Bookmark 9 not found".into())) {
            ApiError::NotFound(msg) => assert_eq!(msg, "Bookmark 9 not found"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_id() {
        let err = ApiError::invalid_id();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "invalid id"));
    }
}
