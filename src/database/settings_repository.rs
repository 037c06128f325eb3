use crate::database::error::DatabaseError;
use sqlx::PgPool;
use std::collections::HashMap;

/// Configuration keys consumed by this service. Names match the shared
/// settings vocabulary used by the wider admin tooling.
pub mod keys {
    pub const ACTIVE_PAYMENT_GATEWAY: &str = "activePaymentGateway";
    pub const PAYMENT_LINK_ID_PREFIX: &str = "paymentLinkIdPrefix";
    pub const PAYMENT_LINK_NUMBER: &str = "paymentLinkNumber";
    pub const CURRENT_FINANCIAL_YEAR: &str = "currentFinancialYear";
    pub const CASHFREE_LINK_STATUS_MAP: &str = "cashfreeLinkStatusMap";
    pub const RAZORPAY_LINK_STATUS_MAP: &str = "razorpayLinkStatusMap";
    pub const CASHFREE_WEBHOOK_SECRET: &str = "cashfreeWebhookSecret";
}

/// Key/value application settings stored in app_settings.
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        sqlx::query_scalar::<_, String>("SELECT value FROM app_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    pub async fn require(&self, key: &str) -> Result<String, DatabaseError> {
        self.get(key)
            .await?
            .ok_or_else(|| DatabaseError::not_found("setting", key))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO app_settings (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    /// Parse a setting stored as a flat JSON object of strings
    /// (e.g. {"invoice":"INV","advance":"ADV"}).
    pub async fn json_map(&self, key: &str) -> Result<HashMap<String, String>, DatabaseError> {
        let raw = self.require(key).await?;
        serde_json::from_str(&raw).map_err(|e| DatabaseError::Query {
            message: format!("setting {} is not a valid JSON map: {}", key, e),
            retryable: false,
        })
    }

    /// Atomically increment a numeric-text counter setting and return the
    /// new value. A single UPDATE..RETURNING, so concurrent allocators can
    /// never observe the same value.
    pub async fn increment_counter(&self, key: &str) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE app_settings
             SET value = ((value)::bigint + 1)::text, updated_at = NOW()
             WHERE key = $1
             RETURNING (value)::bigint",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .ok_or_else(|| DatabaseError::not_found("setting", key))
    }
}
