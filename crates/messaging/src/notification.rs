//! Append-only notification feed for admins.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fire_core::{
    DomainError, DomainResult, Entity, MessageId, NewUserRequestId, NotificationId, UserId, VoucherId,
};

/// Notifications per page in the admin feed.
pub const PER_PAGE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "newUserRequest")]
    NewUserRequest,
    #[serde(rename = "newUserAccepted")]
    NewUserAccepted,
    #[serde(rename = "newUserRejected")]
    NewUserRejected,
    #[serde(rename = "messageSent")]
    MessageSent,
    #[serde(rename = "profileUpdated")]
    ProfileUpdated,
    #[serde(rename = "toppedUp")]
    ToppedUp,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewUserRequest => "newUserRequest",
            NotificationKind::NewUserAccepted => "newUserAccepted",
            NotificationKind::NewUserRejected => "newUserRejected",
            NotificationKind::MessageSent => "messageSent",
            NotificationKind::ProfileUpdated => "profileUpdated",
            NotificationKind::ToppedUp => "toppedUp",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newUserRequest" => Ok(NotificationKind::NewUserRequest),
            "newUserAccepted" => Ok(NotificationKind::NewUserAccepted),
            "newUserRejected" => Ok(NotificationKind::NewUserRejected),
            "messageSent" => Ok(NotificationKind::MessageSent),
            "profileUpdated" => Ok(NotificationKind::ProfileUpdated),
            "toppedUp" => Ok(NotificationKind::ToppedUp),
            other => Err(DomainError::validation(format!("unknown notification type: {other}"))),
        }
    }
}

/// What happened, together with the one entity it happened to.
///
/// The kind fixes the subject type, so a notification can never point at two
/// entities or at the wrong kind of entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    NewUserRequest(NewUserRequestId),
    NewUserAccepted(NewUserRequestId),
    NewUserRejected(NewUserRequestId),
    MessageSent(MessageId),
    ProfileUpdated(UserId),
    ToppedUp(VoucherId),
}

impl Notice {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notice::NewUserRequest(_) => NotificationKind::NewUserRequest,
            Notice::NewUserAccepted(_) => NotificationKind::NewUserAccepted,
            Notice::NewUserRejected(_) => NotificationKind::NewUserRejected,
            Notice::MessageSent(_) => NotificationKind::MessageSent,
            Notice::ProfileUpdated(_) => NotificationKind::ProfileUpdated,
            Notice::ToppedUp(_) => NotificationKind::ToppedUp,
        }
    }

    pub fn new_user_request(&self) -> Option<NewUserRequestId> {
        match self {
            Notice::NewUserRequest(id) | Notice::NewUserAccepted(id) | Notice::NewUserRejected(id) => {
                Some(*id)
            }
            _ => None,
        }
    }

    pub fn message(&self) -> Option<MessageId> {
        match self {
            Notice::MessageSent(id) => Some(*id),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<UserId> {
        match self {
            Notice::ProfileUpdated(id) => Some(*id),
            _ => None,
        }
    }

    pub fn voucher(&self) -> Option<VoucherId> {
        match self {
            Notice::ToppedUp(id) => Some(*id),
            _ => None,
        }
    }

    /// Rebuild a notice from its relational form (type column + nullable references).
    pub fn from_columns(
        kind: NotificationKind,
        new_user_request: Option<NewUserRequestId>,
        message: Option<MessageId>,
        user: Option<UserId>,
        voucher: Option<VoucherId>,
    ) -> DomainResult<Self> {
        let populated = [
            new_user_request.is_some(),
            message.is_some(),
            user.is_some(),
            voucher.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();
        if populated != 1 {
            return Err(DomainError::inconsistency(format!(
                "notification of type {} references {populated} subjects",
                kind.as_str()
            )));
        }

        let mismatch =
            || DomainError::inconsistency(format!("notification of type {} has the wrong subject", kind.as_str()));

        match kind {
            NotificationKind::NewUserRequest => new_user_request.map(Notice::NewUserRequest).ok_or_else(mismatch),
            NotificationKind::NewUserAccepted => new_user_request.map(Notice::NewUserAccepted).ok_or_else(mismatch),
            NotificationKind::NewUserRejected => new_user_request.map(Notice::NewUserRejected).ok_or_else(mismatch),
            NotificationKind::MessageSent => message.map(Notice::MessageSent).ok_or_else(mismatch),
            NotificationKind::ProfileUpdated => user.map(Notice::ProfileUpdated).ok_or_else(mismatch),
            NotificationKind::ToppedUp => voucher.map(Notice::ToppedUp).ok_or_else(mismatch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub notice: Notice,
    pub created: DateTime<Utc>,
}

impl Entity for Notification {
    type Id = NotificationId;

    fn id(&self) -> NotificationId {
        self.id
    }

    fn describe(id: NotificationId) -> String {
        format!("notifications[id={id}]")
    }
}

/// 1-based page of the notification feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub per_page: u32,
}

impl Page {
    /// Page numbers below 1 are clamped to the first page.
    pub fn new(number: u32) -> Self {
        Self {
            number: number.max(1),
            per_page: PER_PAGE,
        }
    }

    pub fn offset(&self) -> usize {
        (self.number as usize - 1) * self.per_page as usize
    }

    pub fn limit(&self) -> usize {
        self.per_page as usize
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1)
    }
}
