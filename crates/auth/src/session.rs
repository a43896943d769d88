//! Session facade: registry operations that end in an issued token.

use serde::Serialize;
use tracing::instrument;

use hrdesk_core::DomainResult;

use crate::account::{Account, NewUser};
use crate::registry::IdentityRegistry;
use crate::store::AccountStore;
use crate::token::{Claims, TokenService};

/// A freshly issued token and the account it was issued for.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    #[serde(rename = "user")]
    pub account: Account,
}

#[derive(Debug, Clone)]
pub struct Sessions<S> {
    registry: IdentityRegistry<S>,
    tokens: TokenService,
}

impl<S> Sessions<S>
where
    S: AccountStore,
{
    pub fn new(registry: IdentityRegistry<S>, tokens: TokenService) -> Self {
        Self { registry, tokens }
    }

    pub fn registry(&self) -> &IdentityRegistry<S> {
        &self.registry
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create a user account and log it in.
    #[instrument(skip(self, input), err)]
    pub async fn register(&self, input: NewUser) -> DomainResult<Session> {
        let account = self.registry.create(input.into()).await?;
        let token = self.tokens.issue(&account)?;
        Ok(Session { token, account })
    }

    #[instrument(skip(self, email, password), err)]
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<Session> {
        let account = self.registry.authenticate(email, password).await?;
        let token = self.tokens.issue(&account)?;
        Ok(Session { token, account })
    }

    /// Verify a bearer token.
    pub fn verify(&self, token: &str) -> DomainResult<Claims> {
        Ok(self.tokens.verify(token)?)
    }

    /// The current state of the account a token was issued for.
    ///
    /// Accounts deleted since the token was issued are `NotFound`.
    pub async fn profile(&self, claims: &Claims) -> DomainResult<Account> {
        self.registry.find_by_id(claims.sub).await
    }
}
