use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fire_accounts::{Gender, NewUserRequest, RequestState, User, UserDraft, UserPatch, UserState};
use fire_billing::{Voucher, VoucherState};
use fire_core::{DomainError, DomainResult, MessageId, NewUserRequestId, NotificationId, UserId, VoucherId};
use fire_messaging::{Message, Notice, Notification, NotificationKind};

use crate::app::services::AppServices;

// -------------------------
// Envelope
// -------------------------

#[derive(Debug, Serialize)]
struct Envelope<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

/// `{"status": "success", "data": ...}`
pub fn success<T: Serialize>(data: T) -> axum::response::Response {
    let body = Envelope {
        status: "success",
        data: Some(data),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `{"status": "success"}` for responses without a payload.
pub fn success_empty() -> axum::response::Response {
    let body: Envelope<()> = Envelope {
        status: "success",
        data: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateNewUserRequest {
    pub user: Option<CandidateBody>,
}

/// Signup payload. `admin` and `state` are not accepted from clients.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateBody {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
    pub password: Option<String>,
}

impl From<CandidateBody> for UserDraft {
    fn from(body: CandidateBody) -> Self {
        UserDraft {
            name: body.name.unwrap_or_default(),
            username: body.username.unwrap_or_default(),
            email: body.email,
            address: body.address,
            gender: body.gender.unwrap_or_default(),
            phone_number: body.phone_number,
            avatar_url: body.avatar_url,
            password: body.password,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub admin: Option<bool>,
    pub gender: Option<Gender>,
    pub state: Option<UserState>,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<PatchUserRequest> for UserPatch {
    fn from(body: PatchUserRequest) -> Self {
        UserPatch {
            name: body.name,
            email: body.email,
            address: body.address,
            admin: body.admin,
            gender: body.gender,
            state: body.state,
            phone_number: body.phone_number,
            avatar_url: body.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemVoucherRequest {
    pub code: Option<String>,
}

impl RedeemVoucherRequest {
    pub fn code(&self) -> DomainResult<&str> {
        match self.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(DomainError::validation("Missing field: code")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    pub page: Option<u32>,
}

// -------------------------
// Response views
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SipView {
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub admin: bool,
    pub gender: Gender,
    pub state: UserState,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
    pub created: DateTime<Utc>,
    pub last_access: Option<DateTime<Utc>>,
    pub sip: SipView,
}

impl UserView {
    pub async fn load(services: &AppServices, id: UserId) -> DomainResult<Self> {
        let user = services.store().get_user(id).await?;
        Ok(Self::new(&user, services.sip_host()))
    }

    pub fn new(user: &User, sip_host: &str) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            address: user.address.clone(),
            admin: user.admin,
            gender: user.gender,
            state: user.state,
            phone_number: user.phone_number.clone(),
            avatar_url: user.avatar_url.clone(),
            created: user.created,
            last_access: user.last_access,
            sip: SipView {
                host: sip_host.to_string(),
            },
        }
    }
}

/// Candidate account of a request not yet accepted. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub admin: bool,
    pub gender: Gender,
    pub state: UserState,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&UserDraft> for CandidateView {
    fn from(draft: &UserDraft) -> Self {
        Self {
            name: draft.name.clone(),
            username: draft.username.clone(),
            email: draft.email.clone(),
            address: draft.address.clone(),
            admin: false,
            gender: draft.gender,
            state: UserState::Pending,
            phone_number: draft.phone_number.clone(),
            avatar_url: draft.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestUserView {
    Promoted(UserView),
    Candidate(CandidateView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserRequestView {
    pub id: NewUserRequestId,
    pub user: RequestUserView,
    pub admin_user: Option<UserView>,
    pub state: RequestState,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl NewUserRequestView {
    pub async fn load(services: &AppServices, request: &NewUserRequest) -> DomainResult<Self> {
        let user = match request.user_id {
            Some(id) => RequestUserView::Promoted(UserView::load(services, id).await?),
            None => RequestUserView::Candidate(CandidateView::from(&request.candidate)),
        };
        let admin_user = match request.admin_user_id {
            Some(id) => Some(UserView::load(services, id).await?),
            None => None,
        };
        Ok(Self {
            id: request.id,
            user,
            admin_user,
            state: request.state,
            created: request.created,
            updated: request.updated,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub text: String,
    pub from_user: UserView,
    pub to_user: UserView,
    pub created: DateTime<Utc>,
}

impl MessageView {
    pub async fn load(services: &AppServices, message: &Message) -> DomainResult<Self> {
        Ok(Self {
            id: message.id,
            text: message.text.clone(),
            from_user: UserView::load(services, message.from_user_id).await?,
            to_user: UserView::load(services, message.to_user_id).await?,
            created: message.created,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherView {
    pub id: VoucherId,
    pub user: Option<UserView>,
    pub state: VoucherState,
    pub code: String,
    pub credit_total: i64,
    pub credit_remaining: i64,
    pub url: Option<String>,
    pub bulk_number: Option<String>,
    pub vendor: Option<String>,
    pub created: DateTime<Utc>,
    pub activated: Option<DateTime<Utc>>,
    pub depleted: Option<DateTime<Utc>>,
}

impl VoucherView {
    pub async fn load(services: &AppServices, voucher: &Voucher) -> DomainResult<Self> {
        let user = match voucher.user_id {
            Some(id) => Some(UserView::load(services, id).await?),
            None => None,
        };
        Ok(Self {
            id: voucher.id,
            user,
            state: voucher.state,
            code: voucher.code.clone(),
            credit_total: voucher.credit_total,
            credit_remaining: voucher.credit_remaining,
            url: voucher.url.clone(),
            bulk_number: voucher.bulk_number.clone(),
            vendor: voucher.vendor.clone(),
            created: voucher.created,
            activated: voucher.activated,
            depleted: voucher.depleted,
        })
    }
}

/// A feed entry with its subject embedded under the subject's own key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_user_request: Option<NewUserRequestView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher: Option<VoucherView>,
}

impl NotificationView {
    pub async fn load(services: &AppServices, notification: &Notification) -> DomainResult<Self> {
        let store = services.store();
        let mut view = Self {
            id: notification.id,
            kind: notification.notice.kind(),
            created: notification.created,
            new_user_request: None,
            message: None,
            user: None,
            voucher: None,
        };
        match notification.notice {
            Notice::NewUserRequest(id) | Notice::NewUserAccepted(id) | Notice::NewUserRejected(id) => {
                let request = store.get_new_user_request(id).await?;
                view.new_user_request = Some(NewUserRequestView::load(services, &request).await?);
            }
            Notice::MessageSent(id) => {
                let message = store.get_message(id).await?;
                view.message = Some(MessageView::load(services, &message).await?);
            }
            Notice::ProfileUpdated(id) => {
                view.user = Some(UserView::load(services, id).await?);
            }
            Notice::ToppedUp(id) => {
                let voucher = store.get_voucher(id).await?;
                view.voucher = Some(VoucherView::load(services, &voucher).await?);
            }
        }
        Ok(view)
    }
}
