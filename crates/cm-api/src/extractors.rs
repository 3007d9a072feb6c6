//! Axum extractors for API handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use cm_auth::{
    cookies::{ACCESS_COOKIE, REFRESH_COOKIE},
    extract_cookie, jwt::extract_bearer_token, require_auth, AccessTokenCodec, AuthService,
    CookiePolicy, EdgeConfig, SessionEdge, SessionUser,
};

use crate::error::ApiError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub edge: Arc<SessionEdge>,
    pub cookies: Arc<CookiePolicy>,
}

impl AppState {
    pub fn new(
        auth: Arc<AuthService>,
        codec: Arc<AccessTokenCodec>,
        secure_cookies: bool,
    ) -> Self {
        Self {
            auth,
            edge: Arc::new(SessionEdge::new(EdgeConfig::default(), codec)),
            cookies: Arc::new(CookiePolicy::new(secure_cookies)),
        }
    }
}

fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| extract_cookie(value, name))
}

/// Access token from the access cookie, or from `Authorization: Bearer`
pub fn access_token(headers: &HeaderMap) -> Option<&str> {
    cookie(headers, ACCESS_COOKIE).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
    })
}

/// Refresh token, read from its cookie only
pub fn refresh_token(headers: &HeaderMap) -> Option<&str> {
    cookie(headers, REFRESH_COOKIE)
}

/// Session of the caller, if any.
///
/// Reuses the identity the session edge already resolved; otherwise decodes
/// the access token. An invalid or expired token reads as no session.
pub struct Session(pub Option<SessionUser>);

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<SessionUser>() {
            return Ok(Session(Some(user.clone())));
        }

        let app_state = AppState::from_ref(state);
        let user = access_token(&parts.headers)
            .and_then(|token| app_state.auth.codec().decode(token).ok())
            .map(SessionUser::from);

        Ok(Session(user))
    }
}

impl Session {
    pub fn user(&self) -> Option<&SessionUser> {
        self.0.as_ref()
    }
}

/// Authenticated user extractor
pub struct CurrentUser(pub SessionUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        let user = require_auth(session.user())?;
        Ok(CurrentUser(user.clone()))
    }
}

impl std::ops::Deref for CurrentUser {
    type Target = SessionUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
