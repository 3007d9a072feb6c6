//! Session edge
//!
//! Classifies a request to one of the role portals from nothing but its
//! access token and path. The HTTP layer turns the decision into a pass
//! through or a redirect; nothing is kept between requests.

use std::sync::Arc;

use cm_models::Role;
use url::form_urlencoded;

use crate::gate::SessionUser;
use crate::jwt::{AccessTokenCodec, JwtError};

/// Where the edge sends rejected traffic, and which prefix needs which role
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    pub login_path: String,
    pub unauthorized_path: String,
    pub portals: Vec<(String, Role)>,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            unauthorized_path: "/unauthorized".to_string(),
            portals: vec![
                ("/consumer".to_string(), Role::Consumer),
                ("/contractor".to_string(), Role::Contractor),
                ("/admin".to_string(), Role::Admin),
            ],
        }
    }
}

/// Outcome of classifying one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    /// Let the request through. Carries the session when the path is a portal.
    Allow(Option<SessionUser>),
    /// No usable token: send to login, remembering where the caller was going
    RedirectLogin { location: String },
    /// Authenticated, but the portal belongs to another role
    RedirectUnauthorized { location: String },
}

pub struct SessionEdge {
    config: EdgeConfig,
    codec: Arc<AccessTokenCodec>,
}

impl SessionEdge {
    pub fn new(config: EdgeConfig, codec: Arc<AccessTokenCodec>) -> Self {
        Self { config, codec }
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Role required for `path`, if it falls under a portal prefix
    pub fn required_role(&self, path: &str) -> Option<Role> {
        let path = path.split('?').next().unwrap_or(path);
        self.config
            .portals
            .iter()
            .find(|(prefix, _)| {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .map(|(_, role)| *role)
    }

    /// Classify a request. `path` may include a query string, which is kept
    /// in the login callback.
    pub fn classify(&self, token: Option<&str>, path: &str) -> EdgeDecision {
        let Some(required) = self.required_role(path) else {
            return EdgeDecision::Allow(None);
        };

        let claims = match token.map(|t| self.codec.decode(t)) {
            Some(Ok(claims)) => claims,
            Some(Err(JwtError::Expired)) => {
                tracing::debug!(path, "Access token expired at the edge");
                return EdgeDecision::RedirectLogin {
                    location: self.login_location(path, true),
                };
            }
            Some(Err(e)) => {
                tracing::debug!(path, error = %e, "Rejected access token at the edge");
                return EdgeDecision::RedirectLogin {
                    location: self.login_location(path, false),
                };
            }
            None => {
                return EdgeDecision::RedirectLogin {
                    location: self.login_location(path, false),
                };
            }
        };

        if claims.role != required {
            tracing::debug!(
                user_id = claims.sub,
                role = %claims.role,
                required = %required,
                path,
                "Role does not match portal"
            );
            return EdgeDecision::RedirectUnauthorized {
                location: self.config.unauthorized_path.clone(),
            };
        }

        EdgeDecision::Allow(Some(SessionUser::from(claims)))
    }

    fn login_location(&self, path: &str, expired: bool) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("callbackUrl", path);
        if expired {
            query.append_pair("error", "SessionExpired");
        }
        format!("{}?{}", self.config.login_path, query.finish())
    }
}
