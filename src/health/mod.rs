/*!
 * # Health Check Module
 *
 * - `/api/v1/health` reports database reachability and answers 503 when
 *   the pool cannot be pinged.
 * - `/api/v1/health/live` only proves the process is serving requests.
 */

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use utoipa::ToSchema;

use crate::{db, AppState};

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Overall health information
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub checks: BTreeMap<String, HealthStatus>,
}

impl HealthReport {
    fn from_checks(checks: BTreeMap<String, HealthStatus>) -> Self {
        let status = if checks.values().all(|s| *s == HealthStatus::Up) {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        };

        Self {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            checks,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "All dependencies reachable", body = HealthReport),
        (status = 503, description = "A dependency is down", body = HealthReport),
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = if db::check_connection(&state.db).await {
        HealthStatus::Up
    } else {
        HealthStatus::Down
    };

    let report = HealthReport::from_checks(BTreeMap::from([("database".to_string(), database)]));
    if report.status != HealthStatus::Up {
        warn!(checks = ?report.checks, "health check failed");
    }

    (report.status_code(), Json(report))
}

#[utoipa::path(
    get,
    path = "/api/v1/health/live",
    responses((status = 200, description = "Process is serving requests", body = HealthReport)),
    tag = "health"
)]
pub async fn liveness_check() -> Json<HealthReport> {
    Json(HealthReport::from_checks(BTreeMap::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_down_check_makes_report_unavailable() {
        let report = HealthReport::from_checks(BTreeMap::from([
            ("database".to_string(), HealthStatus::Down),
        ]));
        assert_eq!(report.status, HealthStatus::Down);
        assert_eq!(report.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn empty_report_is_up() {
        let report = HealthReport::from_checks(BTreeMap::new());
        assert_eq!(report.status_code(), StatusCode::OK);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "up");
    }
}
