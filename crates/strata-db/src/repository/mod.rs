//! Repository implementations.
//!
//! Postgres implementations back the live service; the in-memory
//! implementations back tests and local development without a
//! database.

pub mod memory;
mod refresh_token;
mod schema_record;
mod tenant;
mod user;

pub use refresh_token::PgRefreshTokenRepository;
pub use schema_record::PgSchemaRecordRepository;
pub use tenant::PgTenantRepository;
pub use user::PgUserRepository;

/// The service's baseline schema holding users and refresh tokens.
/// Must match the schema the provisioner bootstraps for this service.
pub(crate) const SERVICE_SCHEMA: &str = "auth";
