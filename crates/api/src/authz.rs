//! API-side authorization guards.
//!
//! Checked in handlers before any registry call, from the role carried by the
//! verified token.

use hrdesk_auth::{authorize, authorize_user_update, AccountPatch, Permission};
use hrdesk_core::{AccountId, DomainError};

use crate::app::errors::ApiError;
use crate::context::AuthContext;

pub fn require(ctx: &AuthContext, permission: Permission) -> Result<(), ApiError> {
    authorize(ctx.principal(), permission).map_err(|e| {
        tracing::debug!(account_id = %ctx.account_id(), permission = %permission, "forbidden");
        ApiError::from(DomainError::from(e))
    })
}

/// User managers may update anyone; others only themselves, without touching
/// role or status.
pub fn require_user_update(
    ctx: &AuthContext,
    target: AccountId,
    patch: &AccountPatch,
) -> Result<(), ApiError> {
    authorize_user_update(ctx.principal(), target, patch).map_err(|e| ApiError::from(DomainError::from(e)))
}
