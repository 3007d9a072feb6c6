//! # cm-models
//!
//! Domain models for ClaimDesk RS: users and their roles, refresh token
//! records, and the claim summary consulted by resource-level authorization.

pub mod claim;
pub mod refresh_token;
pub mod user;

pub use claim::{ClaimStatus, ClaimSummary};
pub use refresh_token::{NewRefreshToken, RefreshToken};
pub use user::{normalize_email, NewUser, PublicUser, Role, UnknownRole, User};
