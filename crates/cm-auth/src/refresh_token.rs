//! Refresh token store
//!
//! Tokens are 256-bit random values handed to the client once. Only a salted
//! Argon2 hash is persisted, so validation scans every live row and compares
//! hashes one by one.
//!
//! Every operation here swallows storage failures: errors are logged and
//! turned into `false` / `None` / `0`, which callers treat as "invalid".
//!
//! The scan is linear in the number of live tokens. If that ever becomes the
//! bottleneck, add an unsalted fingerprint column to narrow the candidates
//! and keep the salted hash for the final comparison.

use std::sync::Arc;

use base64::Engine;
use chrono::{Duration, Utc};
use cm_core::Id;
use cm_db::{RefreshTokenRepository, UserStore};
use cm_models::{NewRefreshToken, RefreshToken, User};
use rand::RngCore;
use tracing::{debug, error, warn};

use crate::password::PasswordService;

/// Refresh token lifetime, also the refresh cookie Max-Age
pub const REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

const TOKEN_BYTES: usize = 32;

/// A presented token that matched a live row
#[derive(Debug, Clone)]
pub struct RefreshTokenMatch {
    pub token_id: Id,
    pub user: User,
}

#[derive(Clone)]
pub struct RefreshTokenStore {
    rows: Arc<dyn RefreshTokenRepository>,
    users: Arc<dyn UserStore>,
    hasher: Arc<PasswordService>,
}

impl RefreshTokenStore {
    pub fn new(
        rows: Arc<dyn RefreshTokenRepository>,
        users: Arc<dyn UserStore>,
        hasher: Arc<PasswordService>,
    ) -> Self {
        Self {
            rows,
            users,
            hasher,
        }
    }

    /// Generate a cryptographically secure, URL-safe opaque token.
    pub fn generate() -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Hash and persist `plaintext` for `user_id`, expiring in seven days.
    pub async fn store(&self, user_id: Id, plaintext: &str) -> Option<RefreshToken> {
        let new_token = self.prepare(user_id, plaintext).await?;

        match self.rows.insert(new_token).await {
            Ok(row) => {
                debug!(user_id, token_id = row.id, "Refresh token stored");
                Some(row)
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to store refresh token");
                None
            }
        }
    }

    /// Find the live row whose hash matches `plaintext` and load its owner.
    pub async fn validate(&self, plaintext: &str) -> Option<RefreshTokenMatch> {
        let candidates = match self.rows.find_live(Utc::now()).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Failed to load refresh tokens");
                return None;
            }
        };

        let hasher = self.hasher.clone();
        let presented = plaintext.to_owned();
        let matched = tokio::task::spawn_blocking(move || {
            candidates
                .into_iter()
                .find(|row| hasher.verify(&presented, Some(&row.token_hash)))
        })
        .await;

        let row = match matched {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!("Presented refresh token matched no live row");
                return None;
            }
            Err(e) => {
                error!(error = %e, "Refresh token comparison task failed");
                return None;
            }
        };

        match self.users.find_by_id(row.user_id).await {
            Ok(Some(user)) => Some(RefreshTokenMatch {
                token_id: row.id,
                user,
            }),
            Ok(None) => {
                warn!(user_id = row.user_id, token_id = row.id, "Refresh token owner no longer exists");
                None
            }
            Err(e) => {
                error!(user_id = row.user_id, error = %e, "Failed to load refresh token owner");
                None
            }
        }
    }

    /// Delete one token. Returns `false` if it was already gone or on failure.
    pub async fn revoke(&self, token_id: Id) -> bool {
        match self.rows.delete(token_id).await {
            Ok(true) => true,
            Ok(false) => {
                debug!(token_id, "Refresh token already revoked");
                false
            }
            Err(e) => {
                error!(token_id, error = %e, "Failed to revoke refresh token");
                false
            }
        }
    }

    /// Delete every token of a user.
    pub async fn revoke_all(&self, user_id: Id) -> bool {
        match self.rows.delete_for_user(user_id).await {
            Ok(count) => {
                debug!(user_id, count, "Refresh tokens revoked");
                true
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to revoke refresh tokens");
                false
            }
        }
    }

    /// Delete every expired token and return how many were removed.
    pub async fn cleanup_expired(&self) -> u64 {
        match self.rows.delete_expired(Utc::now()).await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Failed to clean up expired refresh tokens");
                0
            }
        }
    }

    /// Replace `token_id` with a freshly generated token for `user_id` in one
    /// step and return the new plaintext. `None` when the old token was
    /// already consumed or storage failed; nothing is inserted in that case.
    pub async fn rotate(&self, token_id: Id, user_id: Id) -> Option<String> {
        let plaintext = Self::generate();
        let replacement = self.prepare(user_id, &plaintext).await?;

        match self.rows.rotate(token_id, replacement).await {
            Ok(Some(row)) => {
                debug!(user_id, old_token_id = token_id, new_token_id = row.id, "Refresh token rotated");
                Some(plaintext)
            }
            Ok(None) => {
                warn!(user_id, token_id, "Refresh token was consumed concurrently");
                None
            }
            Err(e) => {
                error!(user_id, token_id, error = %e, "Failed to rotate refresh token");
                None
            }
        }
    }

    async fn prepare(&self, user_id: Id, plaintext: &str) -> Option<NewRefreshToken> {
        let hasher = self.hasher.clone();
        let secret = plaintext.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&secret)).await;

        let token_hash = match hashed {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => {
                error!(user_id, error = %e, "Failed to hash refresh token");
                return None;
            }
            Err(e) => {
                error!(user_id, error = %e, "Refresh token hashing task failed");
                return None;
            }
        };

        Some(NewRefreshToken {
            user_id,
            token_hash,
            expires_at: Utc::now() + Duration::seconds(REFRESH_TOKEN_TTL_SECONDS),
        })
    }
}
