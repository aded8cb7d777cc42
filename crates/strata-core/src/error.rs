//! Error types for the STRATA system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrataError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Limit exceeded: at most {limit} {entity} records allowed for this tenant")]
    LimitExceeded { entity: String, limit: i32 },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Provisioning failed: {message}")]
    Provisioning { message: String },

    #[error("Configuration defect: {message}")]
    Configuration { message: String },

    #[error("Tenant context missing or invalid")]
    TenantContext,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StrataError {
    /// True for absence-style failures the caller may treat as
    /// "no result" rather than a hard error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StrataError::NotFound { .. })
    }
}

pub type StrataResult<T> = Result<T, StrataError>;
