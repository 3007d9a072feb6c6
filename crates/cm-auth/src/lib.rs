//! # cm-auth
//!
//! Authentication and authorization for ClaimDesk RS.
//!
//! ## Features
//!
//! - Argon2id password verification that costs the same for unknown users
//! - Short-lived HS256 access tokens carrying id, email and role
//! - Hashed, rotating refresh tokens with revocation and cleanup
//! - Role gates and the claim visibility predicate
//! - The session edge that classifies requests to the role portals

pub mod cookies;
pub mod error;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh_token;
pub mod service;

pub use cookies::{extract_cookie, CookieConfig, CookiePolicy, SameSite};
pub use error::AuthError;
pub use gate::{authorize_claim, can_access_claim, require_auth, require_role, SessionUser};
pub use jwt::{AccessClaims, AccessTokenCodec, JwtError, ACCESS_TOKEN_TTL_SECONDS};
pub use middleware::{EdgeConfig, EdgeDecision, SessionEdge};
pub use password::{HashParams, PasswordService};
pub use refresh_token::{RefreshTokenMatch, RefreshTokenStore, REFRESH_TOKEN_TTL_SECONDS};
pub use service::{AuthService, AuthSession, Registration};
