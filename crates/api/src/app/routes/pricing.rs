use axum::{
    extract::{Extension, Path},
    response::Response,
};

use fire_billing::{CallPricing, Pricing};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::authz;
use crate::context::CurrentUser;

pub async fn get_pricing(Extension(current): Extension<CurrentUser>) -> Result<Response, ApiError> {
    authz::require_admin(&current)?;
    Ok(dto::success(Pricing::standard()))
}

pub async fn get_call_pricing(Path(number): Path<String>) -> Response {
    dto::success(CallPricing::for_number(&number))
}
