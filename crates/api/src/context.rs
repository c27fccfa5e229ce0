use fire_accounts::User;
use fire_auth::Principal;
use fire_core::UserId;

/// The authenticated caller for a request.
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    user: User,
}

impl CurrentUser {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.user.id, self.user.admin)
    }
}
