use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    Json,
};
use chrono::Utc;

use fire_accounts::{Decision, Transition, UserDraft};
use fire_core::{DomainError, NewUserRequestId};

use crate::app::dto::{self, CreateNewUserRequest, NewUserRequestView};
use crate::app::errors::ApiError;
use crate::app::routes::path_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub async fn list_new_user_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    authz::require_admin(&current)?;

    let requests = services.store().list_new_user_requests().await?;
    let mut views = Vec::with_capacity(requests.len());
    for request in &requests {
        views.push(NewUserRequestView::load(&services, request).await?);
    }
    Ok(dto::success(views))
}

/// Public signup.
pub async fn create_new_user_request(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CreateNewUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let candidate = body
        .user
        .ok_or_else(|| DomainError::validation("Missing field: user"))?;
    let draft = UserDraft::from(candidate).normalized()?;

    let request = services
        .store()
        .create_new_user_request(draft, Utc::now())
        .await?;
    tracing::info!(
        request_id = %request.id,
        username = %request.candidate.username,
        "new user request created"
    );
    Ok(dto::success(NewUserRequestView::load(&services, &request).await?))
}

pub async fn accept_new_user_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    decide(services, current, id, Decision::Accept).await
}

pub async fn reject_new_user_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    decide(services, current, id, Decision::Reject).await
}

async fn decide(
    services: Arc<AppServices>,
    current: CurrentUser,
    id: String,
    decision: Decision,
) -> Result<Response, ApiError> {
    let id = NewUserRequestId::new(path_id(&id)?);
    authz::require_admin(&current)?;

    let decided = services
        .decide_new_user_request(id, decision, current.id())
        .await?;
    if decided.transition == Transition::Refused {
        tracing::debug!(request_id = %id, state = decided.request.state.as_str(), "decision refused");
        return Err(DomainError::validation(format!("Cannot {} newUserRequest", decision.verb())).into());
    }
    Ok(dto::success(NewUserRequestView::load(&services, &decided.request).await?))
}
