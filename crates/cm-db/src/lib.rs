//! # cm-db
//!
//! Database layer for ClaimDesk RS.
//!
//! This crate provides PostgreSQL access using SQLx, including:
//!
//! - Connection pool management and embedded migrations
//! - Store traits for the credential store and refresh token table
//! - PostgreSQL and in-memory implementations of those traits
//!
//! ## Example
//!
//! ```ignore
//! use cm_db::{Database, DatabaseConfig, PgUserRepository, UserStore};
//!
//! let db = Database::connect(&DatabaseConfig::with_url(database_url)).await?;
//! db.migrate().await?;
//!
//! let users = PgUserRepository::new(db.pool().clone());
//! let user = users.find_by_email("consumer@test.com").await?;
//! ```

pub mod memory;
pub mod pool;
pub mod refresh_tokens;
pub mod repository;
pub mod users;

// Re-exports
pub use memory::{MemoryRefreshTokenStore, MemoryUserStore};
pub use pool::{Database, DatabaseConfig};
pub use refresh_tokens::{PgRefreshTokenRepository, RefreshTokenRow};
pub use repository::{RefreshTokenRepository, RepositoryError, RepositoryResult, UserStore};
pub use users::{PgUserRepository, UserRow};
