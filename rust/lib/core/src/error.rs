use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Stable, machine-readable error codes sent as `code` in error bodies.
///
/// Clients match on these, never on the message text.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const CONTENT_REJECTED: &str = "CONTENT_REJECTED";
    pub const UPSTREAM_UNAVAILABLE: &str = "UPSTREAM_UNAVAILABLE";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Error type every module converts into at the HTTP boundary.
///
/// Rendered as `{"code": "NOT_FOUND", "message": "wish 'abc' not found"}`
/// with the status from [`ServiceError::status_code`].
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the resource belongs to someone else.
    #[error("{0}")]
    PermissionDenied(String),

    /// Refused by content moderation.
    #[error("{0}")]
    ContentRejected(String),

    /// The moderation service failed or answered nonsense.
    #[error("{0}")]
    Upstream(String),

    /// Storage failed; the write was rolled back.
    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use error_code::*;
        match self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, ALREADY_EXISTS),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, VALIDATION_FAILED),
            ServiceError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, UNAUTHENTICATED),
            ServiceError::PermissionDenied(_) => (StatusCode::FORBIDDEN, PERMISSION_DENIED),
            ServiceError::ContentRejected(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, CONTENT_REJECTED)
            }
            ServiceError::Upstream(_) => (StatusCode::BAD_GATEWAY, UPSTREAM_UNAVAILABLE),
            ServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, STORAGE_ERROR),
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.parts().1
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    /// Whether the same request may succeed if sent again unchanged.
    /// Storage failures leave nothing behind, so they qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Storage(_) | ServiceError::Upstream(_))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, retryable = self.is_retryable(), error = %self, "request failed");
        }
        let body = serde_json::json!({
            "code": code,
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(msg: &str) -> Vec<ServiceError> {
        vec![
            ServiceError::NotFound(msg.into()),
            ServiceError::Conflict(msg.into()),
            ServiceError::Validation(msg.into()),
            ServiceError::Unauthorized(msg.into()),
            ServiceError::PermissionDenied(msg.into()),
            ServiceError::ContentRejected(msg.into()),
            ServiceError::Upstream(msg.into()),
            ServiceError::Storage(msg.into()),
            ServiceError::Internal(msg.into()),
        ]
    }

    #[test]
    fn codes_and_statuses() {
        let got: Vec<(u16, &str)> = all("x")
            .iter()
            .map(|e| (e.status_code().as_u16(), e.error_code()))
            .collect();
        assert_eq!(
            got,
            vec![
                (404, "NOT_FOUND"),
                (409, "ALREADY_EXISTS"),
                (400, "VALIDATION_FAILED"),
                (401, "UNAUTHENTICATED"),
                (403, "PERMISSION_DENIED"),
                (422, "CONTENT_REJECTED"),
                (502, "UPSTREAM_UNAVAILABLE"),
                (500, "STORAGE_ERROR"),
                (500, "INTERNAL"),
            ]
        );
    }

    #[test]
    fn display_is_the_bare_message() {
        for e in all("wish 123") {
            assert_eq!(e.to_string(), "wish 123");
        }
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        let retryable: Vec<&str> = all("x")
            .iter()
            .filter(|e| e.is_retryable())
            .map(|e| e.error_code())
            .collect();
        assert_eq!(retryable, vec!["UPSTREAM_UNAVAILABLE", "STORAGE_ERROR"]);
    }

    #[test]
    fn response_carries_status_and_json() {
        let resp = ServiceError::ContentRejected("nope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
