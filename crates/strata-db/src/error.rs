//! Database-specific error types and conversions.

use strata_core::error::StrataError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    AlreadyExists { entity: String },
}

impl DbError {
    /// Map a sqlx error on a lookup path, turning row absence into a
    /// typed `NotFound`.
    pub fn on_lookup(err: sqlx::Error, entity: &str, id: impl ToString) -> DbError {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: entity.to_string(),
                id: id.to_string(),
            },
            other => DbError::Sqlx(other),
        }
    }

    /// Map a sqlx error on an insert path, turning a unique violation
    /// into a typed `AlreadyExists`.
    pub fn on_insert(err: sqlx::Error, entity: &str) -> DbError {
        if let sqlx::Error::Database(ref db) = err {
            // 23505 = unique_violation
            if db.code().as_deref() == Some("23505") {
                return DbError::AlreadyExists {
                    entity: entity.to_string(),
                };
            }
        }
        DbError::Sqlx(err)
    }
}

impl From<DbError> for StrataError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StrataError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => StrataError::AlreadyExists { entity },
            DbError::Migration(msg) => StrataError::Provisioning { message: msg },
            other => StrataError::Database(other.to_string()),
        }
    }
}
