use crate::database::error::DatabaseError;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Persisted payment link record. `(pg_link_id, reference_id)` is the
/// reconciliation lookup key; `reference_id` alone is globally unique.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentLink {
    pub id: Uuid,
    pub pg_link_id: String,
    pub reference_id: String,
    pub gateway: String,
    pub contact_id: i64,
    pub link_url: String,
    pub link_qr: Option<String>,
    pub purpose: String,
    pub amount: BigDecimal,
    pub expires_at: Option<NaiveDateTime>,
    pub status: i16,
    pub paid_at: Option<NaiveDateTime>,
    pub expired_at: Option<NaiveDateTime>,
    pub failed_at: Option<NaiveDateTime>,
    pub notify_on_create: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Insert shape for a freshly created link (status is always CREATED).
#[derive(Debug, Clone)]
pub struct NewPaymentLink {
    pub pg_link_id: String,
    pub reference_id: String,
    pub gateway: String,
    pub contact_id: i64,
    pub link_url: String,
    pub link_qr: Option<String>,
    pub purpose: String,
    pub amount: BigDecimal,
    pub expires_at: Option<NaiveDateTime>,
    pub status: i16,
    pub notify_on_create: bool,
}

const LINK_COLUMNS: &str = "id, pg_link_id, reference_id, gateway, contact_id, link_url, link_qr, purpose, amount, expires_at, status, paid_at, expired_at, failed_at, notify_on_create, created_at, updated_at";

pub struct PaymentLinkRepository {
    pool: PgPool,
}

impl PaymentLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, link: &NewPaymentLink) -> Result<PaymentLink, DatabaseError> {
        sqlx::query_as::<_, PaymentLink>(&format!(
            "INSERT INTO payment_links (pg_link_id, reference_id, gateway, contact_id, link_url, link_qr, purpose, amount, expires_at, status, notify_on_create)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {LINK_COLUMNS}"
        ))
        .bind(&link.pg_link_id)
        .bind(&link.reference_id)
        .bind(&link.gateway)
        .bind(link.contact_id)
        .bind(&link.link_url)
        .bind(&link.link_qr)
        .bind(&link.purpose)
        .bind(&link.amount)
        .bind(link.expires_at)
        .bind(link.status)
        .bind(link.notify_on_create)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Option<PaymentLink>, DatabaseError> {
        sqlx::query_as::<_, PaymentLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM payment_links WHERE reference_id = $1"
        ))
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Lookup by the reconciliation key pair. Both identifiers must match;
    /// webhook events for foreign links find nothing here.
    pub async fn find_for_reconciliation(
        &self,
        pg_link_id: &str,
        reference_id: &str,
    ) -> Result<Option<PaymentLink>, DatabaseError> {
        sqlx::query_as::<_, PaymentLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM payment_links WHERE pg_link_id = $1 AND reference_id = $2"
        ))
        .bind(pg_link_id)
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Apply a terminal status. The three timestamp columns are written
    /// explicitly, exactly one non-null, so the exclusivity invariant holds
    /// even when a partially-paid link later expires.
    pub async fn apply_terminal_status(
        &self,
        id: Uuid,
        status: i16,
        paid_at: Option<NaiveDateTime>,
        expired_at: Option<NaiveDateTime>,
        failed_at: Option<NaiveDateTime>,
    ) -> Result<PaymentLink, DatabaseError> {
        sqlx::query_as::<_, PaymentLink>(&format!(
            "UPDATE payment_links
             SET status = $2, paid_at = $3, expired_at = $4, failed_at = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {LINK_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(paid_at)
        .bind(expired_at)
        .bind(failed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
