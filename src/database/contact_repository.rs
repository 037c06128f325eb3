use crate::database::error::DatabaseError;
use sqlx::{FromRow, PgPool};

/// Contact channel categories as stored in contact_channels.category.
pub const CHANNEL_PHONE: i16 = 0;
pub const CHANNEL_EMAIL: i16 = 2;

#[derive(Debug, Clone, FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContactChannel {
    pub contact_id: i64,
    pub category: i16,
    pub value: String,
    pub is_active: bool,
}

/// Read-only access to contacts. Contacts are owned by the wider system;
/// this service only looks them up for link creation and notifications.
pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, contact_id: i64) -> Result<Option<Contact>, DatabaseError> {
        sqlx::query_as::<_, Contact>(
            "SELECT id, name, is_active FROM contacts WHERE id = $1 AND is_active = true",
        )
        .bind(contact_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Most recently added active channel of the given category.
    pub async fn find_channel(
        &self,
        contact_id: i64,
        category: i16,
    ) -> Result<Option<ContactChannel>, DatabaseError> {
        sqlx::query_as::<_, ContactChannel>(
            "SELECT contact_id, category, value, is_active
             FROM contact_channels
             WHERE contact_id = $1 AND category = $2 AND is_active = true
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(contact_id)
        .bind(category)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
