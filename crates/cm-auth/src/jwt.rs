//! Access token codec
//!
//! Access tokens are HS256 JWTs that are never looked up server-side: a valid
//! signature and an unexpired `exp` are the whole proof of authentication.

use chrono::{DateTime, Utc};
use cm_core::Id;
use cm_models::{Role, User};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access token lifetime, also the access cookie Max-Age
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: Id,
    pub email: String,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl AccessClaims {
    pub fn for_user(user: &User, issued_at: DateTime<Utc>, max_age_seconds: i64) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: iat + max_age_seconds,
            iat,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token is expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),
}

/// Signs and verifies access tokens with a process-wide secret
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn encode(&self, claims: &AccessClaims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Mint a token for `user` valid for `max_age_seconds` from now
    pub fn issue(
        &self,
        user: &User,
        max_age_seconds: i64,
    ) -> Result<(String, AccessClaims), JwtError> {
        let claims = AccessClaims::for_user(user, Utc::now(), max_age_seconds);
        let token = self.encode(&claims)?;
        Ok((token, claims))
    }

    /// Verify signature and expiry, then return the claims
    pub fn decode(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}
