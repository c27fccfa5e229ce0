use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fire_auth::AuthzError;
use fire_core::DomainError;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized access";
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "The requested URL was not found on the server";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error returned by handlers and middleware.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    /// Malformed request body or query string.
    BadRequest(String),
    /// No route matches (including path ids that are not integers).
    RouteNotFound,
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        tracing::debug!(reason = %err, "authorization denied");
        ApiError::Domain(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, msg),
            ApiError::RouteNotFound => json_error(StatusCode::NOT_FOUND, ROUTE_NOT_FOUND_MESSAGE),
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        DomainError::NotFound(what) => json_error(StatusCode::NOT_FOUND, format!("Object not found: {what}")),
        DomainError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE),
        DomainError::Inconsistency(msg) => {
            tracing::error!(error = %msg, "internal inconsistency");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, msg)
        }
        DomainError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "status": "error",
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: DomainError) -> StatusCode {
        domain_error_to_response(err).status()
    }

    #[test]
    fn each_domain_error_has_one_status() {
        assert_eq!(status_of(DomainError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::not_found("users[id=9]")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DomainError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(DomainError::inconsistency("x")), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(DomainError::storage("x")), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn denied_policy_is_401() {
        let resp = ApiError::from(AuthzError::AdminRequired).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unmatched_route_is_404() {
        assert_eq!(ApiError::RouteNotFound.into_response().status(), StatusCode::NOT_FOUND);
    }
}
