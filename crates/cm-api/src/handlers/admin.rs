//! Admin handlers

use axum::{extract::State, Json};
use cm_auth::require_role;
use cm_models::Role;
use serde::Serialize;

use crate::error::ApiResult;
use crate::extractors::{AppState, Session};

#[derive(Debug, Serialize)]
pub struct CleanupReport {
    pub deleted: u64,
}

/// Delete expired refresh tokens now instead of waiting for the sweep
///
/// POST /api/admin/tokens/cleanup
pub async fn cleanup_tokens(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<CleanupReport>> {
    let admin = require_role(session.user(), &[Role::Admin])?;

    let deleted = state.auth.tokens().cleanup_expired().await;
    tracing::info!(user_id = admin.id, deleted, "Expired refresh tokens removed");

    Ok(Json(CleanupReport { deleted }))
}
