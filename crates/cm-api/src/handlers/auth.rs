//! Authentication handlers
//!
//! Tokens travel in HttpOnly cookies; response bodies only carry the public
//! user fields.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderName, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use cm_auth::{AuthSession, CookiePolicy, Registration, SessionUser};
use cm_models::{PublicUser, Role};
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{refresh_token, AppState, CurrentUser, Session};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 200))]
    pub name: Option<String>,
    pub role: Role,
}

fn set_session_cookies(
    policy: &CookiePolicy,
    session: &AuthSession,
) -> AppendHeaders<[(HeaderName, String); 2]> {
    AppendHeaders([
        (SET_COOKIE, policy.access.build_cookie(&session.access_token)),
        (SET_COOKIE, policy.refresh.build_cookie(&session.refresh_token)),
    ])
}

fn clear_session_cookies(policy: &CookiePolicy) -> AppendHeaders<[(HeaderName, String); 2]> {
    AppendHeaders([
        (SET_COOKIE, policy.access.build_clear_cookie()),
        (SET_COOKIE, policy.refresh.build_clear_cookie()),
    ])
}

/// Log in with email and password
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.auth.login(&req.email, &req.password).await?;

    Ok((
        StatusCode::OK,
        set_session_cookies(&state.cookies, &session),
        Json(session.user),
    ))
}

/// Exchange the refresh cookie for a new token pair
///
/// POST /api/auth/refresh
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let presented = refresh_token(&headers);

    match state.auth.refresh(presented).await {
        Ok(session) => (
            StatusCode::OK,
            set_session_cookies(&state.cookies, &session),
            Json(session.user),
        )
            .into_response(),
        Err(e) => (clear_session_cookies(&state.cookies), ApiError::from(e)).into_response(),
    }
}

/// End the session everywhere
///
/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> impl IntoResponse {
    match (session.user(), refresh_token(&headers)) {
        (Some(user), _) => {
            if !state.auth.logout(user.id).await {
                tracing::warn!(user_id = user.id, "Logout did not revoke refresh tokens");
            }
        }
        (None, Some(presented)) => {
            if state.auth.logout_by_refresh_token(presented).await.is_none() {
                tracing::warn!("Logout by refresh token revoked nothing");
            }
        }
        (None, None) => tracing::debug!("Logout without a session"),
    }

    (StatusCode::NO_CONTENT, clear_session_cookies(&state.cookies))
}

/// Identity of the current session
///
/// GET /api/auth/me
pub async fn me(user: CurrentUser) -> Json<SessionUser> {
    Json(user.0)
}

/// Create a consumer or contractor account
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    req.validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let user = state
        .auth
        .register(Registration {
            email: req.email,
            password: req.password,
            name: req.name,
            role: req.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}
