//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed caller identity.
    Unauthorized(String),
    /// Malformed path or query parameter.
    BadRequest(String),
    Domain(DomainError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => domain_status(err),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Domain(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let body = match self {
            ApiError::Domain(DomainError::Validation(errors)) => serde_json::json!({
                "error": kind,
                "message": "Validation failed",
                "details": errors,
            }),
            ApiError::Domain(err) => {
                if status.is_server_error() {
                    tracing::error!(error = %err, kind, "request failed");
                }
                serde_json::json!({ "error": kind, "message": err.to_string() })
            }
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) => {
                serde_json::json!({ "error": kind, "message": msg })
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) | DomainError::RegistrationClosed => StatusCode::BAD_REQUEST,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        DomainError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
        DomainError::InvariantViolation(_) | DomainError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ConflictReason;

    #[test]
    fn test_domain_status_mapping() {
        let cases = [
            (DomainError::validation("name", "empty"), StatusCode::BAD_REQUEST),
            (DomainError::RegistrationClosed, StatusCode::BAD_REQUEST),
            (DomainError::not_found("event", "x"), StatusCode::NOT_FOUND),
            (DomainError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                DomainError::Conflict(ConflictReason::SoldOut),
                StatusCode::CONFLICT,
            ),
            (
                DomainError::NotImplemented("paid ticket registration"),
                StatusCode::NOT_IMPLEMENTED,
            ),
            (
                DomainError::UpstreamFailure("timeout".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                DomainError::InvariantViolation("oversold".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_unauthorized_status() {
        let err = ApiError::Unauthorized("missing x-user-id header".into());
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), "unauthorized");
    }
}
