//! Domain models for STRATA.
//!
//! These are the core types shared across all crates.

pub mod refresh_token;
pub mod schema_record;
pub mod tenant;
pub mod user;
