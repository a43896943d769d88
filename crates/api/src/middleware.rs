use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use hrdesk_auth::TokenService;
use hrdesk_core::DomainError;

use crate::app::errors::ApiError;
use crate::context::AuthContext;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: TokenService,
}

/// Verify the bearer token and attach an [`AuthContext`] to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let claims = state.tokens.verify(token).map_err(DomainError::from)?;

    req.extensions_mut().insert(AuthContext::new(claims));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(DomainError::InvalidToken)?;

    let header = header.to_str().map_err(|_| DomainError::InvalidToken)?;

    Ok(TokenService::extract_bearer(header).ok_or(DomainError::InvalidToken)?)
}
