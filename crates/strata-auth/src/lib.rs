//! STRATA Auth — HS256 access token issuance/validation, persisted
//! rotating refresh tokens, and password hashing.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{TokenPair, TokenService};
pub use token::AccessTokenClaims;
