use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    Json,
};
use chrono::Utc;

use fire_accounts::UserPatch;
use fire_core::UserId;

use crate::app::dto::{self, PatchUserRequest, UserView};
use crate::app::errors::ApiError;
use crate::app::routes::path_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub async fn current_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let user = services.current_user(&current).await?;
    Ok(dto::success(UserView::new(&user, services.sip_host())))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    authz::require_admin(&current)?;

    let users = services.store().list_users().await?;
    let views = users
        .iter()
        .map(|u| UserView::new(u, services.sip_host()))
        .collect::<Vec<_>>();
    Ok(dto::success(views))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = UserId::new(path_id(&id)?);
    authz::require_admin_or_owner(&current, id)?;

    Ok(dto::success(UserView::load(&services, id).await?))
}

pub async fn patch_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<PatchUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = UserId::new(path_id(&id)?);
    let Json(body) = body?;
    let patch = UserPatch::from(body);
    authz::authorize_patch(&current, id, &patch)?;

    let user = if patch.is_empty() {
        services.store().get_user(id).await?
    } else {
        let user = services.store().patch_user(id, &patch, Utc::now()).await?;
        tracing::info!(user_id = %id, by = %current.id(), "user updated");
        user
    };
    Ok(dto::success(UserView::new(&user, services.sip_host())))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = UserId::new(path_id(&id)?);
    authz::require_admin(&current)?;

    services.store().delete_user(id).await?;
    tracing::info!(user_id = %id, by = %current.id(), "user deleted");
    Ok(dto::success_empty())
}
