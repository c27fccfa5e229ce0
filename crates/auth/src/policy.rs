use thiserror::Error;

use fire_core::{DomainError, UserId};

/// The authenticated caller, as seen by authorization checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub admin: bool,
}

impl Principal {
    pub fn new(user_id: UserId, admin: bool) -> Self {
        Self { user_id, admin }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    #[error("admin privileges required")]
    AdminRequired,

    #[error("user {0} may only be accessed by its owner or an admin")]
    NotOwner(UserId),
}

impl From<AuthzError> for DomainError {
    fn from(_: AuthzError) -> Self {
        DomainError::Unauthorized
    }
}

/// Pass only for admins.
///
/// - No IO
/// - No lookup of the target
pub fn admin_required(principal: &Principal) -> Result<(), AuthzError> {
    if principal.admin {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// Pass for admins and for the user `target` itself.
pub fn admin_or_owner(principal: &Principal, target: UserId) -> Result<(), AuthzError> {
    if principal.admin || principal.user_id == target {
        Ok(())
    } else {
        Err(AuthzError::NotOwner(target))
    }
}
