//! Authentication errors

use thiserror::Error;

/// Failures surfaced by the auth core.
///
/// `InvalidCredentials` deliberately carries no detail: an unknown email and a
/// wrong password must be indistinguishable to the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Authentication required")]
    Unauthorized,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("{0}")]
    Validation(String),
    #[error("Authentication is temporarily unavailable")]
    Unavailable,
    #[error("Internal error: {0}")]
    Internal(String),
}
