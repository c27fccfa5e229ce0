//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store and credential backend wiring, authentication
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request bodies, response views and the JSON envelope
//! - `errors.rs`: error envelope and status mapping

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use fire_core::DomainResult;

use crate::config::Config;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Router over already-built services.
pub fn router(services: Arc<AppServices>) -> Router {
    // Protected routes: require Basic auth against an active user.
    let protected = routes::router().route_layer(axum::middleware::from_fn_with_state(
        services.clone(),
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router())
        .merge(protected)
        .fallback(routes::system::not_found)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &Config) -> DomainResult<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router(services))
}

