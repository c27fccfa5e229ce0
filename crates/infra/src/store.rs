//! Persistence port.
//!
//! Every method is one atomic unit: a single SQL transaction for Postgres, a
//! single write-lock critical section for the in-memory store. Operations that
//! touch several tables (signup, decisions, redemption, message post, patch,
//! delete) therefore never leave partial state behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fire_accounts::{Decision, NewUserRequest, Transition, User, UserDraft, UserPatch, UserState};
use fire_billing::Voucher;
use fire_core::{DomainResult, MessageId, NewUserRequestId, UserId, VoucherId};
use fire_messaging::{Message, Notice, Notification, Page};

/// Outcome of an accept/reject call on a new-user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decided {
    /// The request as stored after the call.
    pub request: NewUserRequest,
    pub transition: Transition,
}

impl Decided {
    /// True when this call moved the request out of `pending`.
    pub fn applied(&self) -> bool {
        self.transition == Transition::Applied
    }
}

#[async_trait]
pub trait FireStore: Send + Sync {
    // ── users ───────────────────────────────────────────────────────────────

    /// All users ordered by id.
    async fn list_users(&self) -> DomainResult<Vec<User>>;

    /// `NotFound("users[id=N]")` when missing.
    async fn get_user(&self, id: UserId) -> DomainResult<User>;

    /// The active user owning `username`, if any.
    async fn find_active_user(&self, username: &str) -> DomainResult<Option<User>>;

    /// Create an account directly, bypassing the signup workflow.
    async fn insert_user(
        &self,
        draft: &UserDraft,
        admin: bool,
        state: UserState,
        now: DateTime<Utc>,
    ) -> DomainResult<User>;

    /// Apply `patch` and append a `profileUpdated` notification.
    async fn patch_user(&self, id: UserId, patch: &UserPatch, now: DateTime<Utc>) -> DomainResult<User>;

    /// Delete a user together with its messages and notifications.
    ///
    /// Vouchers and new-user requests referencing the user are detached, not deleted.
    async fn delete_user(&self, id: UserId) -> DomainResult<()>;

    // ── new-user requests ───────────────────────────────────────────────────

    async fn list_new_user_requests(&self) -> DomainResult<Vec<NewUserRequest>>;

    async fn get_new_user_request(&self, id: NewUserRequestId) -> DomainResult<NewUserRequest>;

    /// Admit a signup: username checks, insert and `newUserRequest` notification.
    async fn create_new_user_request(
        &self,
        candidate: UserDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<NewUserRequest>;

    /// Store a request record as given (id is assigned). Used for imports.
    async fn insert_new_user_request(&self, request: NewUserRequest) -> DomainResult<NewUserRequest>;

    /// Accept or reject a request.
    ///
    /// Only a pending request is changed. Acceptance promotes the candidate to a
    /// new active user in the same unit of work; the winning transition appends
    /// `newUserAccepted` / `newUserRejected`.
    async fn decide_new_user_request(
        &self,
        id: NewUserRequestId,
        decision: Decision,
        admin: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Decided>;

    // ── messages ────────────────────────────────────────────────────────────

    /// Messages received by `user`, ordered by id.
    async fn messages_for(&self, user: UserId) -> DomainResult<Vec<Message>>;

    async fn get_message(&self, id: MessageId) -> DomainResult<Message>;

    /// Store a message and append `messageSent`.
    async fn post_message(
        &self,
        from: UserId,
        to: UserId,
        text: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Message>;

    // ── vouchers ────────────────────────────────────────────────────────────

    /// Vouchers owned by `user`, ordered by id.
    async fn vouchers_for(&self, user: UserId) -> DomainResult<Vec<Voucher>>;

    async fn get_voucher(&self, id: VoucherId) -> DomainResult<Voucher>;

    /// Store a voucher record as given (id is assigned). Used for imports.
    async fn insert_voucher(&self, voucher: Voucher) -> DomainResult<Voucher>;

    /// Redeem the inactive voucher with `code` for `user` and append `toppedUp`.
    ///
    /// Unknown, active and depleted codes all fail with the same `NotFound`.
    async fn redeem_voucher(&self, user: UserId, code: &str, now: DateTime<Utc>) -> DomainResult<Voucher>;

    // ── notifications ───────────────────────────────────────────────────────

    /// One page of the feed, ordered by creation time then id.
    async fn list_notifications(&self, page: Page) -> DomainResult<Vec<Notification>>;

    async fn append_notification(&self, notice: Notice, now: DateTime<Utc>) -> DomainResult<Notification>;
}
