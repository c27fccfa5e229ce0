//! New-user request workflow.
//!
//! A request starts `Pending` and ends in exactly one of `Accepted` or
//! `Rejected`. Repeating the decision that closed a request is a no-op; the
//! opposite decision is refused. Stores call [`NewUserRequest::decide`] inside
//! their atomic section so the read-modify-write cannot interleave.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fire_core::{DomainError, DomainResult, Entity, NewUserRequestId, UserId};

use crate::user::UserDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Pending,
    Accepted,
    Rejected,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Accepted => "accepted",
            RequestState::Rejected => "rejected",
        }
    }
}

impl FromStr for RequestState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestState::Pending),
            "accepted" => Ok(RequestState::Accepted),
            "rejected" => Ok(RequestState::Rejected),
            other => Err(DomainError::validation(format!("unknown request state: {other}"))),
        }
    }
}

/// Admin decision on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    /// State a pending request ends in after this decision.
    pub fn target(&self) -> RequestState {
        match self {
            Decision::Accept => RequestState::Accepted,
            Decision::Reject => RequestState::Rejected,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Reject => "reject",
        }
    }
}

/// What a decision does to a request in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Pending request moves to the decision's terminal state.
    Applied,
    /// Request already closed by the same decision.
    Unchanged,
    /// Request already closed by the opposite decision.
    Refused,
}

/// Pure transition table.
pub fn plan(state: RequestState, decision: Decision) -> Transition {
    match state {
        RequestState::Pending => Transition::Applied,
        s if s == decision.target() => Transition::Unchanged,
        _ => Transition::Refused,
    }
}

/// A signup request awaiting (or carrying) an admin decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUserRequest {
    pub id: NewUserRequestId,
    /// Candidate account data as submitted.
    pub candidate: UserDraft,
    /// Account created by acceptance. Set once, never cleared by a decision.
    pub user_id: Option<UserId>,
    pub admin_user_id: Option<UserId>,
    pub state: RequestState,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl NewUserRequest {
    pub fn pending(id: NewUserRequestId, candidate: UserDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            candidate,
            user_id: None,
            admin_user_id: None,
            state: RequestState::Pending,
            created: now,
            updated: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == RequestState::Pending
    }

    /// Apply `decision` in place.
    ///
    /// On `Applied` the caller must persist the promoted user (for acceptance)
    /// together with this request; `promoted` is the id it will be stored under.
    pub fn decide(
        &mut self,
        decision: Decision,
        admin: UserId,
        promoted: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Transition {
        let transition = plan(self.state, decision);
        if transition == Transition::Applied {
            self.state = decision.target();
            self.admin_user_id = Some(admin);
            self.updated = now;
            if decision == Decision::Accept {
                self.user_id = promoted;
            }
        }
        transition
    }
}

impl Entity for NewUserRequest {
    type Id = NewUserRequestId;

    fn id(&self) -> NewUserRequestId {
        self.id
    }

    fn describe(id: NewUserRequestId) -> String {
        format!("new_user_requests[id={id}]")
    }
}

/// Signup admission rule shared by every store.
///
/// `user_exists`: an account already owns the username.
/// `pending_exists`: another pending request already asks for it.
pub fn ensure_username_available(
    username: &str,
    user_exists: bool,
    pending_exists: bool,
) -> DomainResult<()> {
    if user_exists {
        return Err(DomainError::validation(format!("User {username} already exist")));
    }
    if pending_exists {
        return Err(DomainError::validation(format!(
            "There is a request for user {username} already pending"
        )));
    }
    Ok(())
}
