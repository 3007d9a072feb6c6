//! Claim summary used for resource-level access checks
//!
//! The full claim model and its CRUD live outside the auth core; only the
//! ownership fields are needed to decide visibility.

use cm_core::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    /// Filed and not yet picked up by a contractor
    New,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub id: Id,
    pub consumer_id: Id,
    pub status: ClaimStatus,
    pub accepted_by_contractor_id: Option<Id>,
}

impl ClaimSummary {
    pub fn is_unclaimed(&self) -> bool {
        self.status == ClaimStatus::New
    }
}
