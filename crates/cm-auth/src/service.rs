//! Authentication service
//!
//! Login, logout, refresh and registration on top of the credential store,
//! the password verifier, the access token codec and the refresh token store.

use std::sync::Arc;

use cm_core::Id;
use cm_db::{RefreshTokenRepository, RepositoryError, UserStore};
use cm_models::{normalize_email, NewUser, PublicUser, Role, User};
use tracing::{debug, error, info, warn};

use crate::error::AuthError;
use crate::jwt::{AccessClaims, AccessTokenCodec, ACCESS_TOKEN_TTL_SECONDS};
use crate::password::PasswordService;
use crate::refresh_token::RefreshTokenStore;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Credentials handed to the client after login or refresh
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub access_claims: AccessClaims,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Self-registration request
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: Role,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: RefreshTokenStore,
    codec: Arc<AccessTokenCodec>,
    passwords: Arc<PasswordService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_rows: Arc<dyn RefreshTokenRepository>,
        codec: Arc<AccessTokenCodec>,
        passwords: Arc<PasswordService>,
    ) -> Self {
        let tokens = RefreshTokenStore::new(refresh_rows, users.clone(), passwords.clone());
        Self {
            users,
            tokens,
            codec,
            passwords,
        }
    }

    pub fn codec(&self) -> &AccessTokenCodec {
        &self.codec
    }

    pub fn tokens(&self) -> &RefreshTokenStore {
        &self.tokens
    }

    /// Verify credentials and open a new session.
    ///
    /// The password check runs whether or not the email is known, and both
    /// failures return the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);

        let user = match self.users.find_by_email(&email).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "User lookup failed during login");
                None
            }
        };

        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        if !self.verify_password(password, stored_hash).await {
            debug!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let Some(user) = user else {
            return Err(AuthError::InvalidCredentials);
        };

        let (access_token, access_claims) = self.mint_access_token(&user)?;

        let refresh_token = RefreshTokenStore::generate();
        if self.tokens.store(user.id, &refresh_token).await.is_none() {
            return Err(AuthError::Unavailable);
        }

        info!(user_id = user.id, role = %user.role, "User logged in");

        Ok(AuthSession {
            access_token,
            access_claims,
            refresh_token,
            user: user.public(),
        })
    }

    /// Revoke every refresh token of the user.
    pub async fn logout(&self, user_id: Id) -> bool {
        let revoked = self.tokens.revoke_all(user_id).await;
        if revoked {
            info!(user_id, "User logged out");
        }
        revoked
    }

    /// Log out the owner of a refresh token, for callers whose access token
    /// has already lapsed. Returns the user id when a session was ended.
    pub async fn logout_by_refresh_token(&self, presented: &str) -> Option<Id> {
        let found = self.tokens.validate(presented).await?;
        self.logout(found.user.id).await.then_some(found.user.id)
    }

    /// Consume a refresh token and issue a fresh access/refresh pair.
    ///
    /// The presented token is replaced before the new access token is
    /// minted, so a token that lost a concurrent race yields nothing.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<AuthSession, AuthError> {
        let presented = presented
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthorized)?;

        let found = self
            .tokens
            .validate(presented)
            .await
            .ok_or(AuthError::Unauthorized)?;

        let refresh_token = self
            .tokens
            .rotate(found.token_id, found.user.id)
            .await
            .ok_or(AuthError::Unauthorized)?;

        let (access_token, access_claims) = self.mint_access_token(&found.user)?;

        debug!(user_id = found.user.id, "Session refreshed");

        Ok(AuthSession {
            access_token,
            access_claims,
            refresh_token,
            user: found.user.public(),
        })
    }

    /// Create a consumer or contractor account.
    pub async fn register(&self, registration: Registration) -> Result<PublicUser, AuthError> {
        if registration.role == Role::Admin {
            warn!("Rejected self-registration as admin");
            return Err(AuthError::Forbidden);
        }
        if registration.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let email = normalize_email(&registration.email);
        if email.is_empty() {
            return Err(AuthError::Validation("Email is required".into()));
        }

        let passwords = self.passwords.clone();
        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {}", e)))??;

        let name = registration
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let user = self
            .users
            .create(NewUser {
                email,
                name,
                password_hash,
                role: registration.role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => {
                    error!(error = %other, "Failed to create user");
                    AuthError::Unavailable
                }
            })?;

        info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user.public())
    }

    async fn verify_password(&self, candidate: &str, stored_hash: Option<String>) -> bool {
        let passwords = self.passwords.clone();
        let candidate = candidate.to_owned();
        tokio::task::spawn_blocking(move || passwords.verify(&candidate, stored_hash.as_deref()))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Password verification task failed");
                false
            })
    }

    fn mint_access_token(&self, user: &User) -> Result<(String, AccessClaims), AuthError> {
        self.codec
            .issue(user, ACCESS_TOKEN_TTL_SECONDS)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }
}
