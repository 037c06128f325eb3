use crate::database::error::DatabaseError;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Stored gateway credentials. Several rows may exist per gateway (key
/// rotation); the newest active row for the requested environment wins.
#[derive(Debug, Clone, FromRow)]
pub struct GatewayConfig {
    pub id: Uuid,
    pub gateway: String,
    pub api_key: String,
    pub api_secret: String,
    pub settlement_account: Option<String>,
    pub is_sandbox: bool,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct GatewayConfigRepository {
    pool: PgPool,
}

impl GatewayConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_active(
        &self,
        gateway: &str,
        sandbox: bool,
    ) -> Result<Option<GatewayConfig>, DatabaseError> {
        sqlx::query_as::<_, GatewayConfig>(
            "SELECT id, gateway, api_key, api_secret, settlement_account, is_sandbox, is_active, created_at
             FROM gateway_configs
             WHERE gateway = $1 AND is_sandbox = $2 AND is_active = true
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(gateway)
        .bind(sandbox)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
