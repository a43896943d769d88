//! Process configuration, read from the environment.

use std::str::FromStr;

use anyhow::Context;

use hrdesk_auth::token::DEFAULT_TTL_MINUTES;
use hrdesk_auth::{HashingConfig, TokenConfig};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_expiration_minutes: i64,
    pub hashing: HashingConfig,
    /// Only honored when built with the `postgres` feature.
    pub database_url: Option<String>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .field("hashing", &self.hashing)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    /// Defaults for everything except the signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            jwt_secret: jwt_secret.into(),
            jwt_expiration_minutes: DEFAULT_TTL_MINUTES,
            hashing: HashingConfig::default(),
            database_url: None,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            });

        let defaults = HashingConfig::default();
        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            jwt_expiration_minutes: parse_or(&lookup, "JWT_EXPIRATION_MINUTES", DEFAULT_TTL_MINUTES)?,
            hashing: HashingConfig {
                memory_kib: parse_or(&lookup, "HASH_MEMORY_KIB", defaults.memory_kib)?,
                iterations: parse_or(&lookup, "HASH_ITERATIONS", defaults.iterations)?,
                parallelism: parse_or(&lookup, "HASH_PARALLELISM", defaults.parallelism)?,
            },
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
        })
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(self.jwt_secret.clone()).with_ttl_minutes(self.jwt_expiration_minutes)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.jwt_expiration_minutes, 1440);
        assert_eq!(config.hashing, HashingConfig::default());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn values_are_read_and_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRATION_MINUTES", "15"),
            ("HASH_ITERATIONS", "3"),
            ("DATABASE_URL", "postgres://localhost/hrdesk"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_config().ttl_minutes, 15);
        assert_eq!(config.hashing.iterations, 3);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/hrdesk"));
    }

    #[test]
    fn malformed_numbers_are_reported_with_their_key() {
        let err = AppConfig::from_lookup(lookup(&[("HASH_MEMORY_KIB", "lots")])).unwrap_err();
        assert!(err.to_string().contains("HASH_MEMORY_KIB"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", AppConfig::new("top-secret"));
        assert!(!rendered.contains("top-secret"));
    }
}
