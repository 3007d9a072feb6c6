//! Session edge middleware for the role portals

use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use cm_auth::EdgeDecision;

use crate::extractors::{access_token, AppState};

/// Classify the request and either pass it on, with the resolved
/// [`cm_auth::SessionUser`] in its extensions, or redirect.
pub async fn session_edge(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let decision = state.edge.classify(access_token(request.headers()), target);

    match decision {
        EdgeDecision::Allow(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        EdgeDecision::Allow(None) => next.run(request).await,
        EdgeDecision::RedirectLogin { location }
        | EdgeDecision::RedirectUnauthorized { location } => {
            Redirect::temporary(&location).into_response()
        }
    }
}
