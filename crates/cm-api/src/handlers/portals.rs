//! Role portal landing routes
//!
//! Every route here sits behind the session edge, which has already checked
//! the role. The handlers only report who is signed in.

use axum::Json;
use cm_core::Id;
use cm_models::Role;
use serde::Serialize;

use crate::error::ApiResult;
use crate::extractors::CurrentUser;

#[derive(Debug, Serialize)]
pub struct PortalView {
    pub portal: Role,
    pub user_id: Id,
    pub email: String,
}

/// GET /consumer, /contractor, /admin and anything below them
pub async fn portal(user: CurrentUser) -> ApiResult<Json<PortalView>> {
    Ok(Json(PortalView {
        portal: user.role,
        user_id: user.id,
        email: user.email.clone(),
    }))
}
