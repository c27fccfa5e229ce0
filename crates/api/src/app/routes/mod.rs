use axum::{
    routing::{get, post},
    Router,
};

use crate::app::errors::ApiError;

pub mod messages;
pub mod new_user_requests;
pub mod notifications;
pub mod pricing;
pub mod system;
pub mod users;
pub mod vouchers;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/currentUser", get(users::current_user))
        .route("/users", get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user).patch(users::patch_user).delete(users::delete_user),
        )
        .route("/users/:id/messages", get(messages::list_messages).post(messages::post_message))
        .route("/users/:id/vouchers", get(vouchers::list_vouchers).post(vouchers::redeem_voucher))
        .route("/newUserRequests", get(new_user_requests::list_new_user_requests))
        .route("/newUserRequests/:id/acceptation", post(new_user_requests::accept_new_user_request))
        .route("/newUserRequests/:id/rejection", post(new_user_requests::reject_new_user_request))
        .route("/notifications", get(notifications::list_notifications))
        .route("/pricing", get(pricing::get_pricing))
        .route("/callPricing/:number", get(pricing::get_call_pricing))
}

/// Endpoints reachable without credentials.
pub fn public_router() -> Router {
    Router::new().route("/newUserRequests", post(new_user_requests::create_new_user_request))
}

/// Numeric path segment. Anything else does not match a route.
pub(crate) fn path_id(raw: &str) -> Result<i64, ApiError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::RouteNotFound);
    }
    raw.parse().map_err(|_| ApiError::RouteNotFound)
}
