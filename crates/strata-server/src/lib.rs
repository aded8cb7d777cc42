//! STRATA Server — HTTP surface.
//!
//! Wires the tenant pipeline (resolution, context binding, bearer
//! authentication) in front of the token and tenant-lifecycle
//! handlers.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
