//! Service health checks.

use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub status: HealthState,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub components: Vec<ComponentHealth>,
}

#[derive(Clone)]
pub struct HealthChecker {
    pool: PgPool,
}

impl HealthChecker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let database = match crate::database::health_check(&self.pool).await {
            Ok(()) => ComponentHealth {
                name: "database",
                status: HealthState::Healthy,
                detail: None,
            },
            Err(e) => ComponentHealth {
                name: "database",
                status: HealthState::Unhealthy,
                detail: Some(e.to_string()),
            },
        };

        let overall = if database.status == HealthState::Healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };

        HealthStatus {
            status: overall,
            components: vec![database],
        }
    }
}
