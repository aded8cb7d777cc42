//! STRATA Core — domain models, error taxonomy, repository traits,
//! the request-scoped tenant context, and tenant resolution.
//!
//! Everything in this crate is storage-agnostic: concrete Postgres
//! implementations of the repository traits live in `strata-db`.

pub mod context;
pub mod error;
pub mod models;
pub mod repository;
pub mod resolver;
pub mod validation;

pub use context::TenantContext;
pub use error::{StrataError, StrataResult};
pub use resolver::TenantResolver;
