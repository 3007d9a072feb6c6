//! Authorization gate
//!
//! Route-level checks (`require_auth`, `require_role`) and the claim
//! visibility predicate. Everything here is pure; the caller resolves the
//! session from the request first.

use cm_core::Id;
use cm_models::{ClaimSummary, Role};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::jwt::AccessClaims;

/// Identity resolved from a verified access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Id,
    pub email: String,
    pub role: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<AccessClaims> for SessionUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Fail with `Unauthorized` when no session was resolved
pub fn require_auth(session: Option<&SessionUser>) -> Result<&SessionUser, AuthError> {
    session.ok_or(AuthError::Unauthorized)
}

/// Fail with `Unauthorized` without a session and `Forbidden` when the
/// session's role is not in `allowed`
pub fn require_role<'a>(
    session: Option<&'a SessionUser>,
    allowed: &[Role],
) -> Result<&'a SessionUser, AuthError> {
    let user = require_auth(session)?;
    if allowed.contains(&user.role) {
        Ok(user)
    } else {
        tracing::debug!(user_id = user.id, role = %user.role, "Role not permitted");
        Err(AuthError::Forbidden)
    }
}

pub fn can_access_claim(user: &SessionUser, claim: &ClaimSummary) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Consumer => claim.consumer_id == user.id,
        Role::Contractor => {
            claim.is_unclaimed() || claim.accepted_by_contractor_id == Some(user.id)
        }
    }
}

/// Visibility check for claim lookups. A hidden claim reports `NotFound` so
/// its existence is not confirmed.
pub fn authorize_claim(user: &SessionUser, claim: &ClaimSummary) -> Result<(), AuthError> {
    if can_access_claim(user, claim) {
        Ok(())
    } else {
        Err(AuthError::NotFound)
    }
}
