//! API routes

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::edge::session_edge;
use crate::extractors::AppState;
use crate::handlers::{admin, auth, portals};

/// Create the complete router
///
/// The session edge wraps the whole router, fallback included, so a
/// portal path with no matching route still redirects an anonymous caller.
/// Paths outside the portals pass straight through it.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth_router())
        .nest("/api/admin", admin_router())
        .merge(portal_router(&state))
        .layer(middleware::from_fn_with_state(state.clone(), session_edge))
        .with_state(state)
}

fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/register", post(auth::register))
        .route("/me", get(auth::me))
}

fn admin_router() -> Router<AppState> {
    Router::new().route("/tokens/cleanup", post(admin::cleanup_tokens))
}

/// Portal pages
fn portal_router(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();
    for (prefix, _) in &state.edge.config().portals {
        router = router
            .route(prefix, get(portals::portal))
            .route(&format!("{}/*rest", prefix), get(portals::portal));
    }
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use chrono::{DateTime, Duration, Utc};
    use cm_auth::{AccessTokenCodec, AuthService, HashParams, PasswordService};
    use cm_core::Id;
    use cm_db::{
        MemoryRefreshTokenStore, MemoryUserStore, RefreshTokenRepository, RepositoryResult,
        UserStore,
    };
    use cm_models::{NewRefreshToken, NewUser, RefreshToken, Role};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"routes-test-secret-32-bytes-long!";
    const PASSWORD: &str = "password123";

    struct TestApp {
        app: Router,
        rows: Arc<MemoryRefreshTokenStore>,
        codec: Arc<AccessTokenCodec>,
    }

    async fn test_app() -> TestApp {
        let rows = Arc::new(MemoryRefreshTokenStore::new());
        test_app_with(rows.clone(), rows).await
    }

    /// Refresh rows whose deletes fail as if the pool were exhausted
    struct DeletesTimeOut(Arc<MemoryRefreshTokenStore>);

    #[async_trait]
    impl RefreshTokenRepository for DeletesTimeOut {
        async fn insert(&self, token: NewRefreshToken) -> RepositoryResult<RefreshToken> {
            self.0.insert(token).await
        }

        async fn find_live(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<RefreshToken>> {
            self.0.find_live(now).await
        }

        async fn delete(&self, _id: Id) -> RepositoryResult<bool> {
            Err(sqlx::Error::PoolTimedOut.into())
        }

        async fn delete_for_user(&self, _user_id: Id) -> RepositoryResult<u64> {
            Err(sqlx::Error::PoolTimedOut.into())
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64> {
            self.0.delete_expired(now).await
        }

        async fn rotate(
            &self,
            old_id: Id,
            replacement: NewRefreshToken,
        ) -> RepositoryResult<Option<RefreshToken>> {
            self.0.rotate(old_id, replacement).await
        }
    }

    async fn test_app_with(
        rows: Arc<MemoryRefreshTokenStore>,
        repository: Arc<dyn RefreshTokenRepository>,
    ) -> TestApp {
        let passwords = Arc::new(
            PasswordService::new(HashParams {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            })
            .unwrap(),
        );

        let users = Arc::new(MemoryUserStore::new());
        for (email, role) in [
            ("consumer@test.com", Role::Consumer),
            ("contractor@test.com", Role::Contractor),
            ("admin@test.com", Role::Admin),
        ] {
            users
                .create(NewUser {
                    email: email.into(),
                    name: None,
                    password_hash: passwords.hash(PASSWORD).unwrap(),
                    role,
                })
                .await
                .unwrap();
        }

        let codec = Arc::new(AccessTokenCodec::new(SECRET));
        let auth = Arc::new(AuthService::new(
            users,
            repository,
            codec.clone(),
            passwords,
        ));

        TestApp {
            app: router(AppState::new(auth, codec.clone(), false)),
            rows,
            codec,
        }
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> Response<Body> {
            self.app.clone().oneshot(request).await.unwrap()
        }

        async fn login(&self, email: &str, password: &str) -> Response<Body> {
            self.send(json_request(
                "/api/auth/login",
                json!({ "email": email, "password": password }),
            ))
            .await
        }

        async fn access_token_for(&self, email: &str) -> String {
            let response = self.login(email, PASSWORD).await;
            cookie_value(&response, "access_token").unwrap()
        }
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn with_cookie(method: &str, uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn set_cookie_for(response: &Response<Body>, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        set_cookie_headers(response)
            .into_iter()
            .find(|c| c.starts_with(&prefix))
    }

    fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
        let cookie = set_cookie_for(response, name)?;
        let (pair, _) = cookie.split_once(';')?;
        let (_, value) = pair.split_once('=')?;
        Some(value.to_string()).filter(|v| !v.is_empty())
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(response: &Response<Body>) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_sets_both_cookies() {
        let t = test_app().await;
        let response = t.login("consumer@test.com", PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);

        let refresh = set_cookie_for(&response, "refresh_token").unwrap();
        assert!(refresh.contains("Max-Age=604800"));
        assert!(refresh.contains("SameSite=Strict"));
        assert!(refresh.contains("HttpOnly"));
        assert!(!refresh.contains("Secure"));

        let access = set_cookie_for(&response, "access_token").unwrap();
        assert!(access.contains("Max-Age=900"));
        assert!(access.contains("SameSite=Lax"));

        let token = cookie_value(&response, "access_token").unwrap();
        let claims = t.codec.decode(&token).unwrap();

        let body = body_json(response).await;
        assert_eq!(body["role"], "CONSUMER");
        assert_eq!(body["email"], "consumer@test.com");
        assert!(body.get("password_hash").is_none());
        assert_eq!(body["id"], claims.sub);
        assert_eq!(t.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_password_is_401() {
        let t = test_app().await;

        for (email, password) in [
            ("consumer@test.com", "wrongpassword"),
            ("nobody@test.com", PASSWORD),
        ] {
            let response = t.login(email, password).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert!(set_cookie_headers(&response).is_empty());
            assert_eq!(
                body_json(response).await,
                json!({ "error": "Invalid credentials" })
            );
        }
        assert!(t.rows.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rotates_cookie() {
        let t = test_app().await;
        let login = t.login("contractor@test.com", PASSWORD).await;
        let old = cookie_value(&login, "refresh_token").unwrap();

        let response = t
            .send(with_cookie(
                "POST",
                "/api/auth/refresh",
                &format!("refresh_token={}", old),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let new = cookie_value(&response, "refresh_token").unwrap();
        assert_ne!(new, old);
        assert!(cookie_value(&response, "access_token").is_some());
        assert_eq!(body_json(response).await["role"], "CONTRACTOR");
        assert_eq!(t.rows.len(), 1);

        let replay = t
            .send(with_cookie(
                "POST",
                "/api/auth/refresh",
                &format!("refresh_token={}", old),
            ))
            .await;
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
        let cleared = set_cookie_for(&replay, "refresh_token").unwrap();
        assert!(cleared.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_refresh_requires_cookie() {
        let t = test_app().await;
        let login = t.login("consumer@test.com", PASSWORD).await;
        let token = cookie_value(&login, "refresh_token").unwrap();

        let response = t
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/refresh")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(t.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_logout_revokes_and_clears() {
        let t = test_app().await;
        let login = t.login("consumer@test.com", PASSWORD).await;
        let access = cookie_value(&login, "access_token").unwrap();
        let refresh = cookie_value(&login, "refresh_token").unwrap();

        let response = t
            .send(with_cookie(
                "POST",
                "/api/auth/logout",
                &format!("access_token={}; refresh_token={}", access, refresh),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        for cookie in set_cookie_headers(&response) {
            assert!(cookie.contains("Max-Age=0"));
        }
        assert!(t.rows.is_empty());
    }

    #[tokio::test]
    async fn test_logout_with_only_refresh_cookie() {
        let t = test_app().await;
        let login = t.login("consumer@test.com", PASSWORD).await;
        let refresh = cookie_value(&login, "refresh_token").unwrap();

        let response = t
            .send(with_cookie(
                "POST",
                "/api/auth/logout",
                &format!("refresh_token={}", refresh),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(t.rows.is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_cookies_when_revocation_fails() {
        let rows = Arc::new(MemoryRefreshTokenStore::new());
        let t = test_app_with(rows.clone(), Arc::new(DeletesTimeOut(rows))).await;
        let login = t.login("consumer@test.com", PASSWORD).await;
        let access = cookie_value(&login, "access_token").unwrap();
        let refresh = cookie_value(&login, "refresh_token").unwrap();

        for cookie in [
            format!("access_token={}; refresh_token={}", access, refresh),
            format!("refresh_token={}", refresh),
        ] {
            let response = t.send(with_cookie("POST", "/api/auth/logout", &cookie)).await;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            let cleared = set_cookie_headers(&response);
            assert_eq!(cleared.len(), 2);
            assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
        }

        // The row survives the failed revocation.
        assert_eq!(t.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_me_accepts_bearer_token() {
        let t = test_app().await;
        let token = t.access_token_for("admin@test.com").await;

        let response = t
            .send(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["role"], "ADMIN");

        let anonymous = t
            .send(Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap())
            .await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_portal_without_session_redirects_to_login() {
        let t = test_app().await;
        let response = t
            .send(
                Request::builder()
                    .uri("/consumer/claims/5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            location(&response),
            "/login?callbackUrl=%2Fconsumer%2Fclaims%2F5"
        );
    }

    #[tokio::test]
    async fn test_portal_trailing_slash_redirects_to_login() {
        let t = test_app().await;

        for (method, uri, callback) in [
            ("GET", "/admin/", "%2Fadmin%2F"),
            ("GET", "/consumer/", "%2Fconsumer%2F"),
            ("GET", "/contractor/", "%2Fcontractor%2F"),
            ("POST", "/admin", "%2Fadmin"),
        ] {
            let response = t
                .send(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await;
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{}", uri);
            assert_eq!(
                location(&response),
                format!("/login?callbackUrl={}", callback)
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_public_path_is_not_redirected() {
        let t = test_app().await;
        let response = t
            .send(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_portal_role_mismatch_redirects_to_unauthorized() {
        let t = test_app().await;
        let token = t.access_token_for("consumer@test.com").await;

        let response = t
            .send(with_cookie(
                "GET",
                "/admin",
                &format!("access_token={}", token),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/unauthorized");
    }

    #[tokio::test]
    async fn test_portal_with_matching_role() {
        let t = test_app().await;
        let token = t.access_token_for("contractor@test.com").await;

        let response = t
            .send(with_cookie(
                "GET",
                "/contractor/jobs",
                &format!("access_token={}", token),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["portal"], "CONTRACTOR");
        assert_eq!(body["email"], "contractor@test.com");
    }

    #[tokio::test]
    async fn test_cleanup_requires_admin() {
        let t = test_app().await;
        let contractor = t.access_token_for("contractor@test.com").await;
        let admin = t.access_token_for("admin@test.com").await;

        for _ in 0..3 {
            t.rows
                .insert(NewRefreshToken {
                    user_id: 1,
                    token_hash: "stale".into(),
                    expires_at: Utc::now() - Duration::hours(1),
                })
                .await
                .unwrap();
        }
        // Two live rows exist from the logins above.
        assert_eq!(t.rows.len(), 5);

        let anonymous = t
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/admin/tokens/cleanup")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let forbidden = t
            .send(with_cookie(
                "POST",
                "/api/admin/tokens/cleanup",
                &format!("access_token={}", contractor),
            ))
            .await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(forbidden).await,
            json!({ "error": "Insufficient permissions" })
        );

        let response = t
            .send(with_cookie(
                "POST",
                "/api/admin/tokens/cleanup",
                &format!("access_token={}", admin),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "deleted": 3 }));
        assert_eq!(t.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_register() {
        let t = test_app().await;

        let created = t
            .send(json_request(
                "/api/auth/register",
                json!({
                    "email": "Fresh@Test.com",
                    "password": "longenough",
                    "name": "Fresh Face",
                    "role": "CONSUMER"
                }),
            ))
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = body_json(created).await;
        assert_eq!(body["email"], "fresh@test.com");
        assert_eq!(body["name"], "Fresh Face");

        let duplicate = t
            .send(json_request(
                "/api/auth/register",
                json!({
                    "email": "consumer@test.com",
                    "password": "longenough",
                    "role": "CONSUMER"
                }),
            ))
            .await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let invalid = t
            .send(json_request(
                "/api/auth/register",
                json!({
                    "email": "not-an-email",
                    "password": "longenough",
                    "role": "CONTRACTOR"
                }),
            ))
            .await;
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let admin = t
            .send(json_request(
                "/api/auth/register",
                json!({
                    "email": "boss@test.com",
                    "password": "longenough",
                    "role": "ADMIN"
                }),
            ))
            .await;
        assert_eq!(admin.status(), StatusCode::FORBIDDEN);
    }
}
