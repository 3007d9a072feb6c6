//! Health checks
//!
//! Liveness only says the process answers. Readiness also pings the
//! database, since no login or refresh can succeed without it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cm_db::Database;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Individual component health
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
}

/// Overall health report
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health checker service
pub struct HealthChecker {
    start_time: Instant,
    check_timeout: Duration,
    db: Option<Database>,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            check_timeout: Duration::from_secs(5),
            db: None,
        }
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    fn report(&self, components: Vec<ComponentHealth>) -> HealthReport {
        let status = if components
            .iter()
            .all(|c| c.status == HealthStatus::Healthy)
        {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn check_database(&self) -> ComponentHealth {
        let start = Instant::now();

        let (status, message) = match &self.db {
            None => (
                HealthStatus::Unhealthy,
                Some("Database not configured".to_string()),
            ),
            Some(db) => {
                match tokio::time::timeout(self.check_timeout, db.ping()).await {
                    Ok(Ok(_)) => (HealthStatus::Healthy, None),
                    Ok(Err(e)) => {
                        warn!(error = %e, "Database health check failed");
                        (HealthStatus::Unhealthy, Some(e.to_string()))
                    }
                    Err(_) => {
                        warn!("Database health check timed out");
                        (
                            HealthStatus::Unhealthy,
                            Some("Health check timed out".to_string()),
                        )
                    }
                }
            }
        };

        ComponentHealth {
            name: "database".to_string(),
            status,
            message,
            response_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /health/live
pub async fn liveness(State(checker): State<Arc<HealthChecker>>) -> Json<HealthReport> {
    Json(checker.report(Vec::new()))
}

/// GET /health/ready
pub async fn readiness(
    State(checker): State<Arc<HealthChecker>>,
) -> (StatusCode, Json<HealthReport>) {
    let report = checker.report(vec![checker.check_database().await]);
    (report.http_status(), Json(report))
}
