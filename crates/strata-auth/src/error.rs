//! Authentication error types.

use strata_core::error::StrataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("token tenant claim does not match the resolved tenant")]
    TenantMismatch,

    #[error("signing secret is {0} bytes; at least {min} are required", min = crate::config::MIN_SECRET_BYTES)]
    WeakSecret(usize),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for StrataError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::AccountDisabled
            | AuthError::TokenExpired
            | AuthError::TenantMismatch
            | AuthError::TokenInvalid(_) => StrataError::Unauthorized {
                reason: err.to_string(),
            },
            AuthError::WeakSecret(_) => StrataError::Configuration {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => StrataError::Internal(msg),
        }
    }
}
