//! STRATA Database — Postgres connection management, per-tenant
//! schema provisioning and migration, schema routing, and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbConfig`], [`connect`])
//! - Embedded migrations with per-schema history ([`migrations`])
//! - The idempotent schema provisioner ([`SchemaProvisioner`])
//! - Data-access routing by tenant context ([`SchemaRouter`])
//! - Postgres and in-memory implementations of the `strata-core`
//!   repository traits ([`repository`])

mod connection;
mod error;
pub mod migrations;
mod provisioner;
pub mod repository;
mod router;

pub use connection::{DbConfig, connect};
pub use error::DbError;
pub use provisioner::{SchemaProvisioner, schema_name};
pub use router::{SchemaRouter, TenantConnection};

