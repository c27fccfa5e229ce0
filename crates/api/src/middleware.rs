use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use fire_auth::BasicCredentials;
use fire_core::DomainError;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CurrentUser;

/// HTTP Basic authentication gate for protected routes.
///
/// Unknown users, inactive users, bad passwords and malformed headers all
/// produce the same 401.
pub async fn auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = extract_basic(req.headers()).ok_or(DomainError::Unauthorized)?;
    let user = services.authenticate(&credentials).await?;

    req.extensions_mut().insert(CurrentUser::new(user));
    Ok(next.run(req).await)
}

fn extract_basic(headers: &HeaderMap) -> Option<BasicCredentials> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    BasicCredentials::parse(header)
}
