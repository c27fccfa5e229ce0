//! API-side authorization guards.
//!
//! Handlers call these before any lookup or mutation on the target, so a
//! denied caller learns nothing about whether the target exists.

use fire_accounts::UserPatch;
use fire_auth::{AuthzError, admin_or_owner, admin_required};
use fire_core::UserId;

use crate::context::CurrentUser;

pub fn require_admin(current: &CurrentUser) -> Result<(), AuthzError> {
    admin_required(&current.principal())
}

pub fn require_admin_or_owner(current: &CurrentUser, target: UserId) -> Result<(), AuthzError> {
    admin_or_owner(&current.principal(), target)
}

/// Owners may edit their own profile but not their `admin` flag or `state`.
pub fn authorize_patch(current: &CurrentUser, target: UserId, patch: &UserPatch) -> Result<(), AuthzError> {
    require_admin_or_owner(current, target)?;
    if patch.touches_privileges() {
        require_admin(current)?;
    }
    Ok(())
}
