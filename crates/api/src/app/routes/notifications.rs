use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::Response,
};

use fire_messaging::Page;

use crate::app::dto::{self, NotificationView, NotificationsQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

/// Admin feed, 50 per page, `?page=N` (1-based).
pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    query: Result<Query<NotificationsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    authz::require_admin(&current)?;
    let Query(query) = query?;
    let page = query.page.map(Page::new).unwrap_or_default();

    let notifications = services.store().list_notifications(page).await?;
    let mut views = Vec::with_capacity(notifications.len());
    for notification in &notifications {
        views.push(NotificationView::load(&services, notification).await?);
    }
    Ok(dto::success(views))
}
