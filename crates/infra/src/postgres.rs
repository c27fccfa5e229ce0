//! Postgres-backed store.
//!
//! Each trait method runs in one transaction (or one statement). State changes
//! that must happen at most once are compare-and-set updates guarded on the
//! current state (`WHERE state = 'pending'`, `WHERE state = 'inactive'`).
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | DomainError |
//! |------------|----------------------|-------------|
//! | Database (unique violation) | `23505` | `Validation` naming the clashing username, email or SIP account |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / other | N/A | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Row};
use tracing::instrument;

use fire_accounts::signup::{ensure_username_available, plan};
use fire_accounts::user::sip_account_in_use;
use fire_accounts::{Decision, NewUserRequest, Transition, User, UserDraft, UserPatch, UserState};
use fire_billing::voucher::code_not_found;
use fire_billing::Voucher;
use fire_core::{
    DomainError, DomainResult, Entity, MessageId, NewUserRequestId, NotificationId, UserId, VoucherId,
};
use fire_messaging::{Message, Notice, Notification, NotificationKind, Page};

use crate::store::{Decided, FireStore};

/// Schema applied by [`PostgresStore::ensure_schema`].
pub const SCHEMA: &str = include_str!("../migrations/0001_fire.sql");

const USER_COLUMNS: &str = "id, name, username, email, address, admin, gender, state, \
                            phone_number, avatar_url, created, last_access";
const REQUEST_COLUMNS: &str = "id, candidate, user_id, admin_user_id, state, created, updated";
const MESSAGE_COLUMNS: &str = "id, text, from_user_id, to_user_id, created";
const VOUCHER_COLUMNS: &str = "id, user_id, state, code, credit_total, credit_remaining, url, \
                               bulk_number, vendor, created, activated, depleted";
const NOTIFICATION_COLUMNS: &str = "id, type, new_user_request_id, message_id, user_id, voucher_id, created";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> DomainResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl FireStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_users(&self) -> DomainResult<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_user(&self, id: UserId) -> DomainResult<User> {
        let mut conn = self.acquire().await?;
        fetch_user(&mut conn, id).await
    }

    #[instrument(skip(self), err)]
    async fn find_active_user(&self, username: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND state = 'active'"
        ))
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_active_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, draft, now), fields(username = %draft.username), err)]
    async fn insert_user(
        &self,
        draft: &UserDraft,
        admin: bool,
        state: UserState,
        now: DateTime<Utc>,
    ) -> DomainResult<User> {
        let mut user = draft.promote(UserId::new(0), now);
        user.admin = admin;
        user.state = state;
        let mut conn = self.acquire().await?;
        insert_user_row(&mut conn, &user).await
    }

    #[instrument(skip(self, patch, now), err)]
    async fn patch_user(&self, id: UserId, patch: &UserPatch, now: DateTime<Utc>) -> DomainResult<User> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                address = COALESCE($4, address),
                admin = COALESCE($5, admin),
                gender = COALESCE($6, gender),
                state = COALESCE($7, state),
                phone_number = COALESCE($8, phone_number),
                avatar_url = COALESCE($9, avatar_url)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(patch.name.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.address.as_deref())
        .bind(patch.admin)
        .bind(patch.gender.map(|g| g.as_str()))
        .bind(patch.state.map(|s| s.as_str()))
        .bind(patch.phone_number.as_deref())
        .bind(patch.avatar_url.as_deref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) if constraint.contains("sip_account") => {
                sip_account_in_use(patch.phone_number.as_deref().unwrap_or_default().trim())
            }
            Some(_) => email_in_use(patch.email.as_deref().unwrap_or_default()),
            None => map_sqlx_error("patch_user", e),
        })?;

        let user = match row {
            Some(row) => user_from_row(&row)?,
            None => return Err(missing::<User>(id)),
        };
        insert_notification(&mut tx, Notice::ProfileUpdated(id), now).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(user)
    }

    /// Foreign keys cascade messages and notifications and null out voucher
    /// and request links.
    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(missing::<User>(id));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_new_user_requests(&self) -> DomainResult<Vec<NewUserRequest>> {
        let rows = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM new_user_requests ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_new_user_requests", e))?;
        rows.iter().map(request_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_new_user_request(&self, id: NewUserRequestId) -> DomainResult<NewUserRequest> {
        let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM new_user_requests WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_new_user_request", e))?;
        match row {
            Some(row) => request_from_row(&row),
            None => Err(missing::<NewUserRequest>(id)),
        }
    }

    #[instrument(skip(self, candidate, now), fields(username = %candidate.username), err)]
    async fn create_new_user_request(
        &self,
        candidate: UserDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<NewUserRequest> {
        let candidate = candidate.normalized()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM users WHERE username = $1) AS user_exists,
                EXISTS (SELECT 1 FROM new_user_requests WHERE username = $1 AND state = 'pending') AS pending_exists,
                EXISTS (
                    SELECT 1 FROM users
                    WHERE COALESCE(NULLIF(btrim(phone_number), ''), username) = $2
                ) AS sip_account_taken
            "#,
        )
        .bind(&candidate.username)
        .bind(candidate.sip_account())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("check_username", e))?;
        let user_exists: bool = row.try_get("user_exists").map_err(|e| map_sqlx_error("check_username", e))?;
        let pending_exists: bool = row
            .try_get("pending_exists")
            .map_err(|e| map_sqlx_error("check_username", e))?;
        ensure_username_available(&candidate.username, user_exists, pending_exists)?;
        let sip_account_taken: bool = row
            .try_get("sip_account_taken")
            .map_err(|e| map_sqlx_error("check_username", e))?;
        if sip_account_taken {
            return Err(sip_account_in_use(candidate.sip_account()));
        }

        let pending = NewUserRequest::pending(NewUserRequestId::new(0), candidate, now);
        let request = insert_request_row(&mut tx, &pending).await?;
        insert_notification(&mut tx, Notice::NewUserRequest(request.id), now).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(request)
    }

    #[instrument(skip(self, request), err)]
    async fn insert_new_user_request(&self, request: NewUserRequest) -> DomainResult<NewUserRequest> {
        let mut conn = self.acquire().await?;
        insert_request_row(&mut conn, &request).await
    }

    #[instrument(skip(self, now), err)]
    async fn decide_new_user_request(
        &self,
        id: NewUserRequestId,
        decision: Decision,
        admin: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Decided> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Concurrent deciders block on the row lock here; whoever commits
        // first wins and the rest see a non-pending row.
        let won = sqlx::query(&format!(
            r#"
            UPDATE new_user_requests
            SET state = $2, admin_user_id = $3, updated = $4
            WHERE id = $1 AND state = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(decision.target().as_str())
        .bind(admin.get())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("decide_new_user_request", e))?;

        let Some(row) = won else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            let request = self.get_new_user_request(id).await?;
            let transition = plan(request.state, decision);
            if transition == Transition::Applied {
                return Err(DomainError::inconsistency(format!(
                    "{} is pending but its update matched no row",
                    NewUserRequest::describe(id)
                )));
            }
            return Ok(Decided { request, transition });
        };

        let mut request = request_from_row(&row)?;
        if decision == Decision::Accept {
            let user = insert_user_row(&mut tx, &request.candidate.promote(UserId::new(0), now)).await?;
            sqlx::query("UPDATE new_user_requests SET user_id = $2 WHERE id = $1")
                .bind(id.get())
                .bind(user.id.get())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("link_promoted_user", e))?;
            request.user_id = Some(user.id);
        }

        let notice = match decision {
            Decision::Accept => Notice::NewUserAccepted(id),
            Decision::Reject => Notice::NewUserRejected(id),
        };
        insert_notification(&mut tx, notice, now).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(Decided {
            request,
            transition: Transition::Applied,
        })
    }

    #[instrument(skip(self), err)]
    async fn messages_for(&self, user: UserId) -> DomainResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE to_user_id = $1 ORDER BY id"
        ))
        .bind(user.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("messages_for", e))?;
        rows.iter().map(message_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_message(&self, id: MessageId) -> DomainResult<Message> {
        let row = sqlx::query(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_message", e))?;
        match row {
            Some(row) => message_from_row(&row),
            None => Err(missing::<Message>(id)),
        }
    }

    #[instrument(skip(self, text, now), err)]
    async fn post_message(
        &self,
        from: UserId,
        to: UserId,
        text: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Message> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        fetch_user(&mut tx, from).await?;
        fetch_user(&mut tx, to).await?;

        let row = sqlx::query(&format!(
            "INSERT INTO messages (text, from_user_id, to_user_id, created) \
             VALUES ($1, $2, $3, $4) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(&text)
        .bind(from.get())
        .bind(to.get())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("post_message", e))?;
        let message = message_from_row(&row)?;
        insert_notification(&mut tx, Notice::MessageSent(message.id), now).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(message)
    }

    #[instrument(skip(self), err)]
    async fn vouchers_for(&self, user: UserId) -> DomainResult<Vec<Voucher>> {
        let rows = sqlx::query(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("vouchers_for", e))?;
        rows.iter().map(voucher_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_voucher(&self, id: VoucherId) -> DomainResult<Voucher> {
        let row = sqlx::query(&format!("SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_voucher", e))?;
        match row {
            Some(row) => voucher_from_row(&row),
            None => Err(missing::<Voucher>(id)),
        }
    }

    #[instrument(skip(self, voucher), fields(code = %voucher.code), err)]
    async fn insert_voucher(&self, voucher: Voucher) -> DomainResult<Voucher> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO vouchers (
                user_id, state, code, credit_total, credit_remaining,
                url, bulk_number, vendor, created, activated, depleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {VOUCHER_COLUMNS}
            "#
        ))
        .bind(voucher.user_id.map(UserId::get))
        .bind(voucher.state.as_str())
        .bind(&voucher.code)
        .bind(voucher.credit_total)
        .bind(voucher.credit_remaining)
        .bind(voucher.url.as_deref())
        .bind(voucher.bulk_number.as_deref())
        .bind(voucher.vendor.as_deref())
        .bind(voucher.created)
        .bind(voucher.activated)
        .bind(voucher.depleted)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            if unique_violation(&e).is_some() {
                DomainError::validation(format!("Voucher with code {} already exists", voucher.code))
            } else {
                map_sqlx_error("insert_voucher", e)
            }
        })?;
        voucher_from_row(&row)
    }

    #[instrument(skip(self, code, now), err)]
    async fn redeem_voucher(&self, user: UserId, code: &str, now: DateTime<Utc>) -> DomainResult<Voucher> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        fetch_user(&mut tx, user).await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE vouchers
            SET state = 'active', activated = $3, user_id = $2
            WHERE code = $1 AND state = 'inactive'
            RETURNING {VOUCHER_COLUMNS}
            "#
        ))
        .bind(code)
        .bind(user.get())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("redeem_voucher", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(code_not_found(code));
        };
        let voucher = voucher_from_row(&row)?;
        insert_notification(&mut tx, Notice::ToppedUp(voucher.id), now).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(voucher)
    }

    #[instrument(skip(self), err)]
    async fn list_notifications(&self, page: Page) -> DomainResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications ORDER BY created, id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_notifications", e))?;
        rows.iter().map(notification_from_row).collect()
    }

    #[instrument(skip(self, now), err)]
    async fn append_notification(&self, notice: Notice, now: DateTime<Utc>) -> DomainResult<Notification> {
        let mut conn = self.acquire().await?;
        insert_notification(&mut conn, notice, now).await
    }
}

impl PostgresStore {
    async fn acquire(&self) -> DomainResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))
    }
}

async fn fetch_user(conn: &mut PgConnection, id: UserId) -> DomainResult<User> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?;
    match row {
        Some(row) => user_from_row(&row),
        None => Err(missing::<User>(id)),
    }
}

/// Insert `user` (its id is ignored) and return the stored row.
async fn insert_user_row(conn: &mut PgConnection, user: &User) -> DomainResult<User> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO users (
            name, username, email, address, admin, gender, state,
            phone_number, avatar_url, created, last_access
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&user.name)
    .bind(&user.username)
    .bind(user.email.as_deref())
    .bind(user.address.as_deref())
    .bind(user.admin)
    .bind(user.gender.as_str())
    .bind(user.state.as_str())
    .bind(user.phone_number.as_deref())
    .bind(user.avatar_url.as_deref())
    .bind(user.created)
    .bind(user.last_access)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match unique_violation(&e) {
        Some(constraint) if constraint.contains("email") => {
            email_in_use(user.email.as_deref().unwrap_or_default())
        }
        Some(constraint) if constraint.contains("sip_account") => sip_account_in_use(user.sip_account()),
        Some(_) => DomainError::validation(format!("User {} already exist", user.username)),
        None => map_sqlx_error("insert_user", e),
    })?;
    user_from_row(&row)
}

/// Insert `request` (its id is ignored) and return the stored row.
async fn insert_request_row(conn: &mut PgConnection, request: &NewUserRequest) -> DomainResult<NewUserRequest> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO new_user_requests (username, candidate, user_id, admin_user_id, state, created, updated)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(&request.candidate.username)
    .bind(Json(&request.candidate))
    .bind(request.user_id.map(UserId::get))
    .bind(request.admin_user_id.map(UserId::get))
    .bind(request.state.as_str())
    .bind(request.created)
    .bind(request.updated)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if unique_violation(&e).is_some() {
            DomainError::validation(format!(
                "There is a request for user {} already pending",
                request.candidate.username
            ))
        } else {
            map_sqlx_error("insert_new_user_request", e)
        }
    })?;
    request_from_row(&row)
}

async fn insert_notification(
    conn: &mut PgConnection,
    notice: Notice,
    now: DateTime<Utc>,
) -> DomainResult<Notification> {
    let row = sqlx::query(
        r#"
        INSERT INTO notifications (type, new_user_request_id, message_id, user_id, voucher_id, created)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(notice.kind().as_str())
    .bind(notice.new_user_request().map(NewUserRequestId::get))
    .bind(notice.message().map(MessageId::get))
    .bind(notice.user().map(UserId::get))
    .bind(notice.voucher().map(VoucherId::get))
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_notification", e))?;
    let id: i64 = row.try_get("id").map_err(|e| map_sqlx_error("insert_notification", e))?;
    Ok(Notification {
        id: NotificationId::new(id),
        notice,
        created: now,
    })
}

fn missing<E: Entity>(id: E::Id) -> DomainError {
    DomainError::not_found(E::describe(id))
}

fn email_in_use(email: &str) -> DomainError {
    DomainError::validation(format!("Email {email} already in use"))
}

// Row decoding

fn decode<T>(row: &PgRow, column: &str) -> DomainResult<T>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| DomainError::storage(format!("failed to read column {column}: {e}")))
}

fn user_from_row(row: &PgRow) -> DomainResult<User> {
    Ok(User {
        id: UserId::new(decode(row, "id")?),
        name: decode(row, "name")?,
        username: decode(row, "username")?,
        email: decode(row, "email")?,
        address: decode(row, "address")?,
        admin: decode(row, "admin")?,
        gender: decode::<String>(row, "gender")?.parse()?,
        state: decode::<String>(row, "state")?.parse()?,
        phone_number: decode(row, "phone_number")?,
        avatar_url: decode(row, "avatar_url")?,
        created: decode(row, "created")?,
        last_access: decode(row, "last_access")?,
    })
}

fn request_from_row(row: &PgRow) -> DomainResult<NewUserRequest> {
    let Json(candidate): Json<UserDraft> = decode(row, "candidate")?;
    Ok(NewUserRequest {
        id: NewUserRequestId::new(decode(row, "id")?),
        candidate,
        user_id: decode::<Option<i64>>(row, "user_id")?.map(UserId::new),
        admin_user_id: decode::<Option<i64>>(row, "admin_user_id")?.map(UserId::new),
        state: decode::<String>(row, "state")?.parse()?,
        created: decode(row, "created")?,
        updated: decode(row, "updated")?,
    })
}

fn message_from_row(row: &PgRow) -> DomainResult<Message> {
    Ok(Message {
        id: MessageId::new(decode(row, "id")?),
        text: decode(row, "text")?,
        from_user_id: UserId::new(decode(row, "from_user_id")?),
        to_user_id: UserId::new(decode(row, "to_user_id")?),
        created: decode(row, "created")?,
    })
}

fn voucher_from_row(row: &PgRow) -> DomainResult<Voucher> {
    Ok(Voucher {
        id: VoucherId::new(decode(row, "id")?),
        user_id: decode::<Option<i64>>(row, "user_id")?.map(UserId::new),
        state: decode::<String>(row, "state")?.parse()?,
        code: decode(row, "code")?,
        credit_total: decode(row, "credit_total")?,
        credit_remaining: decode(row, "credit_remaining")?,
        url: decode(row, "url")?,
        bulk_number: decode(row, "bulk_number")?,
        vendor: decode(row, "vendor")?,
        created: decode(row, "created")?,
        activated: decode(row, "activated")?,
        depleted: decode(row, "depleted")?,
    })
}

fn notification_from_row(row: &PgRow) -> DomainResult<Notification> {
    let kind: NotificationKind = decode::<String>(row, "type")?.parse()?;
    let notice = Notice::from_columns(
        kind,
        decode::<Option<i64>>(row, "new_user_request_id")?.map(NewUserRequestId::new),
        decode::<Option<i64>>(row, "message_id")?.map(MessageId::new),
        decode::<Option<i64>>(row, "user_id")?.map(UserId::new),
        decode::<Option<i64>>(row, "voucher_id")?.map(VoucherId::new),
    )?;
    Ok(Notification {
        id: NotificationId::new(decode(row, "id")?),
        notice,
        created: decode(row, "created")?,
    })
}

/// Map SQLx errors to DomainError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => {
            DomainError::storage(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => DomainError::storage(format!("connection pool closed in {operation}")),
        _ => DomainError::storage(format!("sqlx error in {operation}: {err}")),
    }
}

/// Name of the violated constraint when `err` is a unique violation.
fn unique_violation(err: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return Some(db_err.constraint().unwrap_or_default().to_string());
        }
    }
    None
}
