//! Password hashing and verification
//!
//! Every hash is Argon2id with one fixed cost, so verification latency only
//! depends on the configured parameters. When no user exists the candidate is
//! checked against a dummy hash built with the same parameters, which keeps
//! "unknown email" and "wrong password" indistinguishable by wall-clock time.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::RngCore;

use crate::error::AuthError;

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    /// OWASP recommended parameters: m=19456 (19 MiB), t=2, p=1
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl From<&cm_core::config::AuthConfig> for HashParams {
    fn from(config: &cm_core::config::AuthConfig) -> Self {
        Self {
            memory_kib: config.password_memory_kib,
            iterations: config.password_iterations,
            parallelism: config.password_parallelism,
        }
    }
}

/// Hashes secrets and verifies candidates in constant cost.
pub struct PasswordService {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl PasswordService {
    /// Build the service and precompute the dummy hash.
    pub fn new(params: HashParams) -> Result<Self, AuthError> {
        let argon_params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| AuthError::Internal(format!("Invalid Argon2 params: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

        let mut filler = [0u8; 32];
        rand::rng().fill_bytes(&mut filler);
        let dummy_hash = hash_with(&argon2, &filler)?;

        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a secret with a fresh random salt
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        hash_with(&self.argon2, secret.as_bytes())
    }

    /// Verify `candidate` against `stored_hash`, or against the dummy hash
    /// when there is none. The full Argon2 computation always runs.
    pub fn verify(&self, candidate: &str, stored_hash: Option<&str>) -> bool {
        match stored_hash {
            Some(hash) => self.matches(candidate, hash),
            None => {
                let _ = self.matches(candidate, &self.dummy_hash);
                false
            }
        }
    }

    pub fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }

    fn matches(&self, candidate: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored hash is not a valid PHC string");
                if let Ok(dummy) = PasswordHash::new(&self.dummy_hash) {
                    let _ = self.argon2.verify_password(candidate.as_bytes(), &dummy);
                }
                false
            }
        }
    }
}

fn hash_with(argon2: &Argon2<'_>, secret: &[u8]) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AuthError::Internal(format!("Salt encoding failed: {}", e)))?;

    argon2
        .hash_password(secret, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
}
