//! Session cookies
//!
//! Two cookies carry a session: the short-lived access token (`SameSite=Lax`,
//! so top-level navigations into the portals keep working) and the long-lived
//! refresh token (`SameSite=Strict`). Both are HttpOnly, scoped to `/`, and
//! marked Secure only in production.

use crate::jwt::ACCESS_TOKEN_TTL_SECONDS;
use crate::refresh_token::REFRESH_TOKEN_TTL_SECONDS;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Same-site policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes of one cookie
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub max_age: i64,
}

impl CookieConfig {
    pub fn access(secure: bool) -> Self {
        Self {
            name: ACCESS_COOKIE.to_string(),
            path: "/".to_string(),
            secure,
            http_only: true,
            same_site: SameSite::Lax,
            max_age: ACCESS_TOKEN_TTL_SECONDS,
        }
    }

    pub fn refresh(secure: bool) -> Self {
        Self {
            name: REFRESH_COOKIE.to_string(),
            path: "/".to_string(),
            secure,
            http_only: true,
            same_site: SameSite::Strict,
            max_age: REFRESH_TOKEN_TTL_SECONDS,
        }
    }

    /// Build a `Set-Cookie` header value carrying `value`
    pub fn build_cookie(&self, value: &str) -> String {
        self.render(value, self.max_age)
    }

    /// Build a `Set-Cookie` header value that clears the cookie.
    ///
    /// Browsers only drop a cookie when path and flags match the original,
    /// so every attribute is repeated with `Max-Age=0`.
    pub fn build_clear_cookie(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: i64) -> String {
        let mut parts = vec![format!("{}={}", self.name, value)];

        parts.push(format!("Path={}", self.path));

        if self.http_only {
            parts.push("HttpOnly".to_string());
        }

        if self.secure {
            parts.push("Secure".to_string());
        }

        parts.push(format!("SameSite={}", self.same_site.as_str()));
        parts.push(format!("Max-Age={}", max_age));

        parts.join("; ")
    }
}

/// The pair of cookies a session is carried in
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub access: CookieConfig,
    pub refresh: CookieConfig,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self {
            access: CookieConfig::access(secure),
            refresh: CookieConfig::refresh(secure),
        }
    }
}

/// Extract a cookie value from a `Cookie` header
pub fn extract_cookie<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
