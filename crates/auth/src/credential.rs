//! Credential store: salted password hashing and verification.
//!
//! Argon2id with a tunable work factor. Hashing is CPU-bound; the async
//! wrappers move it onto the blocking pool so a slow hash never stalls other
//! requests.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

/// Longest secret accepted by [`CredentialStore::protect`], in bytes.
pub const MAX_SECRET_BYTES: usize = 256;

/// Argon2 work-factor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashingConfig {
    /// Minimal work factor. Only for tests and benchmarks.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// A PHC-formatted password hash.
///
/// Deliberately not `Serialize`, and redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a PHC string loaded from storage.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("password must not be empty")]
    Empty,

    #[error("password must not exceed {MAX_SECRET_BYTES} bytes")]
    TooLong,

    #[error("invalid hashing parameters: {0}")]
    Config(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Hashes and verifies account secrets.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    params: Params,
    /// Hash of a throwaway secret, verified against when no account matched so
    /// unknown and known emails cost the same.
    decoy: PasswordHash,
}

impl CredentialStore {
    pub fn new(config: HashingConfig) -> Result<Self, CredentialError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| CredentialError::Config(e.to_string()))?;
        let mut store = Self {
            params,
            decoy: PasswordHash(String::new()),
        };
        store.decoy = store.protect("decoy-secret-never-issued")?;
        Ok(store)
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// One-way, salted transform of `plaintext`.
    pub fn protect(&self, plaintext: &str) -> Result<PasswordHash, CredentialError> {
        if plaintext.is_empty() {
            return Err(CredentialError::Empty);
        }
        if plaintext.len() > MAX_SECRET_BYTES {
            return Err(CredentialError::TooLong);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Ok(PasswordHash(hash.to_string()))
    }

    /// Constant-time check of `plaintext` against `hash`.
    ///
    /// Malformed hashes verify as `false`.
    pub fn verify(&self, plaintext: &str, hash: &PasswordHash) -> bool {
        let Ok(parsed) = PhcString::new(hash.as_str()) else {
            return false;
        };
        self.hasher()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burn one verification's worth of CPU. Always `false`.
    pub fn verify_decoy(&self, plaintext: &str) -> bool {
        let _ = self.verify(plaintext, &self.decoy);
        false
    }

    /// [`Self::protect`] on the blocking pool.
    pub async fn protect_blocking(&self, plaintext: String) -> Result<PasswordHash, CredentialError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.protect(&plaintext))
            .await
            .map_err(|e| CredentialError::Hashing(format!("hashing task failed: {e}")))?
    }

    /// [`Self::verify`] on the blocking pool. `None` verifies against the decoy.
    pub async fn verify_blocking(&self, plaintext: String, hash: Option<PasswordHash>) -> bool {
        let store = self.clone();
        let joined = tokio::task::spawn_blocking(move || match hash {
            Some(hash) => store.verify(&plaintext, &hash),
            None => store.verify_decoy(&plaintext),
        })
        .await;

        match joined {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                false
            }
        }
    }
}
