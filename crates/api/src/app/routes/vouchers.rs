use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    Json,
};
use chrono::Utc;

use fire_core::UserId;

use crate::app::dto::{self, RedeemVoucherRequest, VoucherView};
use crate::app::errors::ApiError;
use crate::app::routes::path_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub async fn list_vouchers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = UserId::new(path_id(&id)?);
    authz::require_admin_or_owner(&current, id)?;

    let user = services.store().get_user(id).await?;
    let vouchers = services.store().vouchers_for(user.id).await?;
    let mut views = Vec::with_capacity(vouchers.len());
    for voucher in &vouchers {
        views.push(VoucherView::load(&services, voucher).await?);
    }
    Ok(dto::success(views))
}

/// Top up the path user's balance with a voucher code.
pub async fn redeem_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<RedeemVoucherRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = UserId::new(path_id(&id)?);
    authz::require_admin_or_owner(&current, id)?;
    let Json(body) = body?;
    let code = body.code()?;

    let voucher = services.store().redeem_voucher(id, code, Utc::now()).await?;
    tracing::info!(voucher_id = %voucher.id, user_id = %id, "voucher redeemed");
    Ok(dto::success(VoucherView::load(&services, &voucher).await?))
}
