//! In-memory store.
//!
//! All tables sit behind one `RwLock`; every trait method takes the lock once,
//! which gives each operation the same all-or-nothing behavior as a SQL
//! transaction.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use fire_accounts::signup::{ensure_username_available, plan};
use fire_accounts::user::sip_account_in_use;
use fire_accounts::{Decision, NewUserRequest, Transition, User, UserDraft, UserPatch, UserState};
use fire_billing::voucher::code_not_found;
use fire_billing::Voucher;
use fire_core::{
    DomainError, DomainResult, Entity, MessageId, NewUserRequestId, NotificationId, UserId, VoucherId,
};
use fire_messaging::{Message, Notice, Notification, Page};

use crate::store::{Decided, FireStore};

#[derive(Debug, Default)]
struct Sequences {
    user: i64,
    request: i64,
    message: i64,
    voucher: i64,
    notification: i64,
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    requests: BTreeMap<NewUserRequestId, NewUserRequest>,
    messages: BTreeMap<MessageId, Message>,
    vouchers: BTreeMap<VoucherId, Voucher>,
    notifications: Vec<Notification>,
    seq: Sequences,
}

impl Tables {
    fn username_taken(&self, username: &str) -> bool {
        self.users.values().any(|u| u.username == username)
    }

    fn ensure_email_free(&self, email: Option<&str>, owner: Option<UserId>) -> DomainResult<()> {
        let Some(email) = email else {
            return Ok(());
        };
        let clash = self
            .users
            .values()
            .any(|u| u.email.as_deref() == Some(email) && Some(u.id) != owner);
        if clash {
            return Err(email_in_use(email));
        }
        Ok(())
    }

    /// No other user may share the registrar account (phone number, or
    /// username when there is none).
    fn ensure_sip_account_free(&self, account: &str, owner: Option<UserId>) -> DomainResult<()> {
        let clash = self
            .users
            .values()
            .any(|u| u.sip_account() == account && Some(u.id) != owner);
        if clash {
            return Err(sip_account_in_use(account));
        }
        Ok(())
    }

    fn notify(&mut self, notice: Notice, now: DateTime<Utc>) -> Notification {
        let notification = Notification {
            id: NotificationId::new(bump(&mut self.seq.notification)),
            notice,
            created: now,
        };
        self.notifications.push(notification);
        notification
    }
}

fn email_in_use(email: &str) -> DomainError {
    DomainError::validation(format!("Email {email} already in use"))
}

fn missing<E: Entity>(id: E::Id) -> DomainError {
    DomainError::not_found(E::describe(id))
}

/// Process-local store used by tests and by deployments without a database.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| DomainError::storage("in-memory store lock poisoned"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| DomainError::storage("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl FireStore for InMemoryStore {
    async fn list_users(&self) -> DomainResult<Vec<User>> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn get_user(&self, id: UserId) -> DomainResult<User> {
        self.read()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| missing::<User>(id))
    }

    async fn find_active_user(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username && u.is_active())
            .cloned())
    }

    #[instrument(skip(self, draft), fields(username = %draft.username), err)]
    async fn insert_user(
        &self,
        draft: &UserDraft,
        admin: bool,
        state: UserState,
        now: DateTime<Utc>,
    ) -> DomainResult<User> {
        let mut t = self.write()?;
        if t.username_taken(&draft.username) {
            return Err(DomainError::validation(format!("User {} already exist", draft.username)));
        }
        t.ensure_email_free(draft.email.as_deref(), None)?;
        t.ensure_sip_account_free(draft.sip_account(), None)?;

        let id = UserId::new(bump(&mut t.seq.user));
        let mut user = draft.promote(id, now);
        user.admin = admin;
        user.state = state;
        t.users.insert(id, user.clone());
        Ok(user)
    }

    #[instrument(skip(self, patch, now), err)]
    async fn patch_user(&self, id: UserId, patch: &UserPatch, now: DateTime<Utc>) -> DomainResult<User> {
        let mut t = self.write()?;
        let mut user = t.users.get(&id).cloned().ok_or_else(|| missing::<User>(id))?;
        t.ensure_email_free(patch.email.as_deref(), Some(id))?;

        patch.apply(&mut user);
        t.ensure_sip_account_free(user.sip_account(), Some(id))?;
        t.users.insert(id, user.clone());
        t.notify(Notice::ProfileUpdated(id), now);
        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> DomainResult<()> {
        let mut t = self.write()?;
        if t.users.remove(&id).is_none() {
            return Err(missing::<User>(id));
        }

        let dropped: Vec<MessageId> = t
            .messages
            .values()
            .filter(|m| m.from_user_id == id || m.to_user_id == id)
            .map(|m| m.id)
            .collect();
        for message in &dropped {
            t.messages.remove(message);
        }

        t.notifications.retain(|n| match n.notice {
            Notice::MessageSent(m) => !dropped.contains(&m),
            Notice::ProfileUpdated(u) => u != id,
            _ => true,
        });

        for voucher in t.vouchers.values_mut() {
            if voucher.user_id == Some(id) {
                voucher.user_id = None;
            }
        }
        for request in t.requests.values_mut() {
            if request.user_id == Some(id) {
                request.user_id = None;
            }
            if request.admin_user_id == Some(id) {
                request.admin_user_id = None;
            }
        }
        Ok(())
    }

    async fn list_new_user_requests(&self) -> DomainResult<Vec<NewUserRequest>> {
        Ok(self.read()?.requests.values().cloned().collect())
    }

    async fn get_new_user_request(&self, id: NewUserRequestId) -> DomainResult<NewUserRequest> {
        self.read()?
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| missing::<NewUserRequest>(id))
    }

    #[instrument(skip(self, candidate, now), fields(username = %candidate.username), err)]
    async fn create_new_user_request(
        &self,
        candidate: UserDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<NewUserRequest> {
        let candidate = candidate.normalized()?;
        let mut t = self.write()?;

        let pending_exists = t
            .requests
            .values()
            .any(|r| r.is_pending() && r.candidate.username == candidate.username);
        ensure_username_available(
            &candidate.username,
            t.username_taken(&candidate.username),
            pending_exists,
        )?;
        t.ensure_sip_account_free(candidate.sip_account(), None)?;

        let id = NewUserRequestId::new(bump(&mut t.seq.request));
        let request = NewUserRequest::pending(id, candidate, now);
        t.requests.insert(id, request.clone());
        t.notify(Notice::NewUserRequest(id), now);
        Ok(request)
    }

    async fn insert_new_user_request(&self, request: NewUserRequest) -> DomainResult<NewUserRequest> {
        let mut t = self.write()?;
        let id = NewUserRequestId::new(bump(&mut t.seq.request));
        let request = NewUserRequest { id, ..request };
        t.requests.insert(id, request.clone());
        Ok(request)
    }

    #[instrument(skip(self, now), err)]
    async fn decide_new_user_request(
        &self,
        id: NewUserRequestId,
        decision: Decision,
        admin: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Decided> {
        let mut t = self.write()?;
        let mut request = t
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| missing::<NewUserRequest>(id))?;

        let planned = plan(request.state, decision);
        if planned != Transition::Applied {
            return Ok(Decided {
                request,
                transition: planned,
            });
        }

        let promoted = match decision {
            Decision::Accept => {
                let username = &request.candidate.username;
                if t.username_taken(username) {
                    return Err(DomainError::validation(format!("User {username} already exist")));
                }
                t.ensure_email_free(request.candidate.email.as_deref(), None)?;
                t.ensure_sip_account_free(request.candidate.sip_account(), None)?;
                let user_id = UserId::new(bump(&mut t.seq.user));
                t.users.insert(user_id, request.candidate.promote(user_id, now));
                Some(user_id)
            }
            Decision::Reject => None,
        };

        let transition = request.decide(decision, admin, promoted, now);
        t.requests.insert(id, request.clone());
        let notice = match decision {
            Decision::Accept => Notice::NewUserAccepted(id),
            Decision::Reject => Notice::NewUserRejected(id),
        };
        t.notify(notice, now);
        Ok(Decided { request, transition })
    }

    async fn messages_for(&self, user: UserId) -> DomainResult<Vec<Message>> {
        Ok(self
            .read()?
            .messages
            .values()
            .filter(|m| m.to_user_id == user)
            .cloned()
            .collect())
    }

    async fn get_message(&self, id: MessageId) -> DomainResult<Message> {
        self.read()?
            .messages
            .get(&id)
            .cloned()
            .ok_or_else(|| missing::<Message>(id))
    }

    #[instrument(skip(self, text, now), err)]
    async fn post_message(
        &self,
        from: UserId,
        to: UserId,
        text: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Message> {
        let mut t = self.write()?;
        for user in [from, to] {
            if !t.users.contains_key(&user) {
                return Err(missing::<User>(user));
            }
        }

        let id = MessageId::new(bump(&mut t.seq.message));
        let message = Message {
            id,
            text,
            from_user_id: from,
            to_user_id: to,
            created: now,
        };
        t.messages.insert(id, message.clone());
        t.notify(Notice::MessageSent(id), now);
        Ok(message)
    }

    async fn vouchers_for(&self, user: UserId) -> DomainResult<Vec<Voucher>> {
        Ok(self
            .read()?
            .vouchers
            .values()
            .filter(|v| v.user_id == Some(user))
            .cloned()
            .collect())
    }

    async fn get_voucher(&self, id: VoucherId) -> DomainResult<Voucher> {
        self.read()?
            .vouchers
            .get(&id)
            .cloned()
            .ok_or_else(|| missing::<Voucher>(id))
    }

    async fn insert_voucher(&self, voucher: Voucher) -> DomainResult<Voucher> {
        let mut t = self.write()?;
        if t.vouchers.values().any(|v| v.code == voucher.code) {
            return Err(DomainError::validation(format!(
                "Voucher with code {} already exists",
                voucher.code
            )));
        }
        let id = VoucherId::new(bump(&mut t.seq.voucher));
        let voucher = Voucher { id, ..voucher };
        t.vouchers.insert(id, voucher.clone());
        Ok(voucher)
    }

    #[instrument(skip(self, code, now), err)]
    async fn redeem_voucher(&self, user: UserId, code: &str, now: DateTime<Utc>) -> DomainResult<Voucher> {
        let mut t = self.write()?;
        if !t.users.contains_key(&user) {
            return Err(missing::<User>(user));
        }
        let voucher = t
            .vouchers
            .values_mut()
            .find(|v| v.code == code)
            .ok_or_else(|| code_not_found(code))?;

        voucher.redeem(user, now)?;
        let voucher = voucher.clone();
        t.notify(Notice::ToppedUp(voucher.id), now);
        Ok(voucher)
    }

    async fn list_notifications(&self, page: Page) -> DomainResult<Vec<Notification>> {
        let t = self.read()?;
        let mut feed: Vec<Notification> = t.notifications.clone();
        feed.sort_by_key(|n| (n.created, n.id));
        Ok(feed.into_iter().skip(page.offset()).take(page.limit()).collect())
    }

    async fn append_notification(&self, notice: Notice, now: DateTime<Utc>) -> DomainResult<Notification> {
        Ok(self.write()?.notify(notice, now))
    }
}
