use hrdesk_auth::{Claims, Principal};
use hrdesk_core::AccountId;

/// Authenticated caller for a request, inserted by the bearer middleware.
///
/// Must be present for every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    claims: Claims,
    principal: Principal,
}

impl AuthContext {
    pub fn new(claims: Claims) -> Self {
        let principal = Principal::from(claims.clone());
        Self { claims, principal }
    }

    pub fn account_id(&self) -> AccountId {
        self.principal.id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}
