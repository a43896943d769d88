use thiserror::Error;

use hrdesk_core::AccountId;

use crate::account::AccountPatch;
use crate::policy::derive_permissions;
use crate::token::Claims;
use crate::{Permission, Role};

/// A verified caller, resolved from token claims.
///
/// Permissions are never read from the token; they are derived from the role
/// at decision time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: AccountId,
    pub role: Role,
    pub name: String,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            name: claims.name,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: cannot change own role or status")]
    SelfAccessChange,
}

/// Check that `principal`'s role grants `required`.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: Permission) -> Result<(), AuthzError> {
    if derive_permissions(principal.role).allows(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Updating a user account: user managers may change anything; everyone else
/// may only edit their own profile, and never their own role or status.
pub fn authorize_user_update(
    principal: &Principal,
    target: AccountId,
    patch: &AccountPatch,
) -> Result<(), AuthzError> {
    if authorize(principal, Permission::ManageUsers).is_ok() {
        return Ok(());
    }
    if principal.id != target {
        return Err(AuthzError::Forbidden(Permission::ManageUsers.as_str().to_string()));
    }
    if patch.changes_access() {
        return Err(AuthzError::SelfAccessChange);
    }
    Ok(())
}
