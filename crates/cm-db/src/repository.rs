//! Store traits and repository errors
//!
//! The auth core only talks to storage through these traits, so the same
//! services run against PostgreSQL in production and the in-memory stores in
//! tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cm_core::Id;
use cm_models::{NewRefreshToken, NewUser, RefreshToken, User};

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Credential store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by an already-normalized email
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>>;

    /// Insert a user; a duplicate email yields [`RepositoryError::Conflict`]
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;
}

/// Persistence for hashed refresh tokens
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, token: NewRefreshToken) -> RepositoryResult<RefreshToken>;

    /// Snapshot of every row with `expires_at > now`
    async fn find_live(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<RefreshToken>>;

    /// Delete one row; `false` when it was already gone
    async fn delete(&self, id: Id) -> RepositoryResult<bool>;

    async fn delete_for_user(&self, user_id: Id) -> RepositoryResult<u64>;

    /// Delete every row with `expires_at <= now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64>;

    /// Atomically replace `old_id` with `replacement`.
    ///
    /// Returns `None` without inserting anything when `old_id` no longer
    /// exists, so a consumed token can never be rotated twice.
    async fn rotate(
        &self,
        old_id: Id,
        replacement: NewRefreshToken,
    ) -> RepositoryResult<Option<RefreshToken>>;
}

/// Check for a PostgreSQL unique violation (SQLSTATE 23505)
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
