//! Schema routing: selecting the physical schema for data access
//! based on the current tenant context.

use std::ops::{Deref, DerefMut};

use sqlx::PgConnection;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, Postgres};
use tracing::trace;

use strata_core::TenantContext;
use strata_core::error::{StrataError, StrataResult};
use strata_core::models::tenant::TenantInfo;

use crate::error::DbError;
use crate::provisioner::schema_name;

/// A pooled connection pinned to one tenant's schema for its lifetime.
///
/// The schema is selected once, explicitly, when the connection is
/// acquired — there is no naming-strategy side-channel rewriting table
/// names later. The pool resets `search_path` when the connection is
/// released.
pub struct TenantConnection {
    conn: PoolConnection<Postgres>,
    schema: String,
}

impl TenantConnection {
    /// The schema every unqualified table reference resolves to.
    pub fn schema(&self) -> &str {
        &self.schema
    }
}

impl Deref for TenantConnection {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for TenantConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

/// Hands out connections routed to the schema of the tenant bound to
/// the current execution unit.
#[derive(Clone)]
pub struct SchemaRouter {
    pool: PgPool,
    schema_prefix: String,
}

impl SchemaRouter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_prefix: "tenant_".into(),
        }
    }

    /// Acquire a connection routed to the current tenant's schema.
    ///
    /// Fails with [`StrataError::TenantContext`] when no tenant (or a
    /// tenant without a resolved name) is bound — business data access
    /// without an identity is a programming error, not a fallback to
    /// a shared schema.
    pub async fn connection(&self) -> StrataResult<TenantConnection> {
        let name = TenantContext::current_name().ok_or(StrataError::TenantContext)?;
        self.connection_to(&schema_name(&self.schema_prefix, &name))
            .await
    }

    /// Acquire a connection routed to an explicit tenant, for
    /// out-of-band work (bootstrap, admin tooling) that runs outside
    /// a request scope.
    pub async fn connection_for(&self, tenant: &TenantInfo) -> StrataResult<TenantConnection> {
        self.connection_to(&schema_name(&self.schema_prefix, &tenant.name))
            .await
    }

    async fn connection_to(&self, schema: &str) -> StrataResult<TenantConnection> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StrataError::from(DbError::from(e)))?;

        // schema comes from schema_name(), so it is already a safe
        // identifier; quoted anyway.
        sqlx::query(&format!("SET search_path TO \"{schema}\", public"))
            .execute(&mut *conn)
            .await
            .map_err(|e| StrataError::from(DbError::from(e)))?;

        trace!(schema, "routed connection to tenant schema");
        Ok(TenantConnection {
            conn,
            schema: schema.to_string(),
        })
    }
}
