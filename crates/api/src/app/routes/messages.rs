use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    Json,
};
use chrono::Utc;

use fire_core::UserId;
use fire_messaging::message::validate_text;

use crate::app::dto::{self, MessageView, PostMessageRequest};
use crate::app::errors::ApiError;
use crate::app::routes::path_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

/// Messages received by the path user.
pub async fn list_messages(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = UserId::new(path_id(&id)?);
    authz::require_admin_or_owner(&current, id)?;

    let user = services.store().get_user(id).await?;
    let messages = services.store().messages_for(user.id).await?;
    let mut views = Vec::with_capacity(messages.len());
    for message in &messages {
        views.push(MessageView::load(&services, message).await?);
    }
    Ok(dto::success(views))
}

pub async fn post_message(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = UserId::new(path_id(&id)?);
    authz::require_admin(&current)?;
    let Json(body) = body?;
    let text = validate_text(body.text.as_deref())?;

    let message = services
        .store()
        .post_message(current.id(), id, text, Utc::now())
        .await?;
    tracing::info!(message_id = %message.id, from = %current.id(), to = %id, "message sent");
    Ok(dto::success(MessageView::load(&services, &message).await?))
}
