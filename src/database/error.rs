use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Database connection error: {message}")]
    Connection { message: String },

    #[error("Database query error: {message}")]
    Query { message: String, retryable: bool },
}

impl DatabaseError {
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound {
                entity: "row".to_string(),
                id: String::new(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Connection {
                    message: err.to_string(),
                }
            }
            _ => DatabaseError::Query {
                message: err.to_string(),
                retryable: false,
            },
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        DatabaseError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = DatabaseError::from_sqlx(sqlx::Error::RowNotFound);
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn not_found_display_includes_entity() {
        let err = DatabaseError::not_found("PaymentLink", "INV-2425-000042");
        assert_eq!(err.to_string(), "PaymentLink not found: INV-2425-000042");
    }
}
