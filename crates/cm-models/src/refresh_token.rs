//! Refresh token record

use chrono::{DateTime, Utc};
use cm_core::Id;

/// Persisted refresh token. Only the salted hash of the token is kept.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: Id,
    pub user_id: Id,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// A token is live strictly before its expiry instant.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: Id,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
