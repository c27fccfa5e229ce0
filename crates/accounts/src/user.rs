use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fire_core::{DomainError, DomainResult, Entity, UserId};

/// Gender as declared by the account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unspecified,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Unspecified => "unspecified",
        }
    }
}

impl FromStr for Gender {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "female" => Ok(Gender::Female),
            "male" => Ok(Gender::Male),
            "unspecified" => Ok(Gender::Unspecified),
            other => Err(DomainError::validation(format!("unknown gender: {other}"))),
        }
    }
}

/// Account lifecycle state. Only `Active` users can authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Pending,
    Active,
    Inactive,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Pending => "pending",
            UserState::Active => "active",
            UserState::Inactive => "inactive",
        }
    }
}

impl FromStr for UserState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UserState::Pending),
            "active" => Ok(UserState::Active),
            "inactive" => Ok(UserState::Inactive),
            other => Err(DomainError::validation(format!("unknown user state: {other}"))),
        }
    }
}

/// A persisted user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
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
}

impl User {
    pub fn is_active(&self) -> bool {
        self.state == UserState::Active
    }

    /// Key of this user's account on the SIP registrar.
    ///
    /// The registrar indexes subscribers by phone number; users without one fall
    /// back to their username.
    pub fn sip_account(&self) -> &str {
        registrar_account(self.phone_number.as_deref(), &self.username)
    }
}

/// Registrar key for a phone number / username pair: the trimmed phone number
/// when present, the username otherwise. At most one user may own a key.
pub fn registrar_account<'a>(phone_number: Option<&'a str>, username: &'a str) -> &'a str {
    match phone_number.map(str::trim) {
        Some(phone) if !phone.is_empty() => phone,
        _ => username,
    }
}

pub fn sip_account_in_use(account: &str) -> DomainError {
    DomainError::validation(format!("SIP account {account} already in use"))
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn describe(id: UserId) -> String {
        format!("users[id={id}]")
    }
}

/// Account data submitted with a signup request, not yet a user.
///
/// The draft never carries the admin flag: promoted accounts always start as
/// regular users.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserDraft {
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gender: Gender,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
    /// Registrar password to provision on acceptance. Never rendered.
    pub password: Option<String>,
}

impl UserDraft {
    /// Trim the username and reject drafts that cannot become an account.
    pub fn normalized(mut self) -> DomainResult<Self> {
        self.username = self.username.trim().to_string();
        if self.username.is_empty() {
            return Err(DomainError::validation("Missing field: username"));
        }
        if self.password.as_deref().is_some_and(|p| p.is_empty()) {
            self.password = None;
        }
        Ok(self)
    }

    /// Build the active account that acceptance creates.
    pub fn promote(&self, id: UserId, now: DateTime<Utc>) -> User {
        User {
            id,
            name: self.name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            admin: false,
            gender: self.gender,
            state: UserState::Active,
            phone_number: self.phone_number.clone(),
            avatar_url: self.avatar_url.clone(),
            created: now,
            last_access: None,
        }
    }

    pub fn sip_account(&self) -> &str {
        registrar_account(self.phone_number.as_deref(), &self.username)
    }
}

/// Partial update of a user. `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub admin: Option<bool>,
    pub gender: Option<Gender>,
    pub state: Option<UserState>,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserPatch {
    /// True when the patch changes fields only an admin may change.
    pub fn touches_privileges(&self) -> bool {
        self.admin.is_some() || self.state.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == UserPatch::default()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = Some(email.clone());
        }
        if let Some(address) = &self.address {
            user.address = Some(address.clone());
        }
        if let Some(admin) = self.admin {
            user.admin = admin;
        }
        if let Some(gender) = self.gender {
            user.gender = gender;
        }
        if let Some(state) = self.state {
            user.state = state;
        }
        if let Some(phone) = &self.phone_number {
            user.phone_number = Some(phone.clone());
        }
        if let Some(avatar) = &self.avatar_url {
            user.avatar_url = Some(avatar.clone());
        }
    }
}
