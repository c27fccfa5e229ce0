use axum::http::StatusCode;

use crate::app::errors::ApiError;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Fallback for unmatched routes. Never requires credentials.
pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}
