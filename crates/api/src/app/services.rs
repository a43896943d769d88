//! Service wiring: picks an account store and assembles the session facade.

use std::sync::Arc;

use anyhow::Context;

use hrdesk_auth::{AccountStore, CredentialStore, IdentityRegistry, Sessions, TokenService};
use hrdesk_infra::InMemoryAccountStore;

use crate::config::AppConfig;

pub type SharedStore = Arc<dyn AccountStore>;

/// Everything handlers need, shared behind an `Arc` extension.
#[derive(Clone)]
pub struct AppServices {
    pub sessions: Sessions<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, config: &AppConfig) -> anyhow::Result<Self> {
        let credentials =
            CredentialStore::new(config.hashing).context("invalid password hashing parameters")?;
        let tokens = TokenService::new(config.token_config()).context("invalid token configuration")?;

        Ok(Self {
            sessions: Sessions::new(IdentityRegistry::new(store, credentials), tokens),
        })
    }

    pub fn registry(&self) -> &IdentityRegistry<SharedStore> {
        self.sessions.registry()
    }

    pub fn tokens(&self) -> &TokenService {
        self.sessions.tokens()
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store = build_store(config).await?;
    AppServices::new(store, config)
}

#[cfg(feature = "postgres")]
async fn build_store(config: &AppConfig) -> anyhow::Result<SharedStore> {
    if let Some(url) = config.database_url.as_deref() {
        let store = hrdesk_infra::PostgresAccountStore::connect(url)
            .await
            .context("failed to connect to postgres")?;
        tracing::info!("using postgres account store");
        return Ok(Arc::new(store));
    }
    tracing::info!("DATABASE_URL not set; using in-memory account store");
    Ok(Arc::new(InMemoryAccountStore::new()))
}

#[cfg(not(feature = "postgres"))]
async fn build_store(config: &AppConfig) -> anyhow::Result<SharedStore> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the postgres feature is disabled; using in-memory store");
    }
    Ok(Arc::new(InMemoryAccountStore::new()))
}
