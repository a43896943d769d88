use axum::{
    routing::{get, post},
    Router,
};

use hrdesk_auth::{Account, AccountKind};
use hrdesk_core::{AccountId, DomainError};

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub mod auth;
pub mod employees;
pub mod system;
pub mod users;

/// Routes reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
}

/// Routes behind the bearer middleware.
pub fn protected_router() -> Router {
    Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .nest("/api/users", users::router())
        .nest("/api/employees", employees::router())
}

/// Look up `id`, treating an account of the other kind as missing.
pub(crate) async fn find_of_kind(
    services: &AppServices,
    id: AccountId,
    kind: AccountKind,
) -> ApiResult<Account> {
    let account = services.registry().find_by_id(id).await?;
    if account.kind() != kind {
        return Err(DomainError::NotFound.into());
    }
    Ok(account)
}
