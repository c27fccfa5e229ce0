use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fire_core::{DomainError, DomainResult, Entity, MessageId, UserId};

/// A message sent from one user to another. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub created: DateTime<Utc>,
}

impl Entity for Message {
    type Id = MessageId;

    fn id(&self) -> MessageId {
        self.id
    }

    fn describe(id: MessageId) -> String {
        format!("messages[id={id}]")
    }
}

/// Validate the body of a message about to be sent.
pub fn validate_text(text: Option<&str>) -> DomainResult<String> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(DomainError::validation("Missing field: text")),
    }
}
