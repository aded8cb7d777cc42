//! Idempotent per-tenant schema provisioning.
//!
//! Every step — schema creation, migration application, provenance
//! upsert — is individually idempotent, so a partially provisioned
//! schema is repaired simply by calling [`SchemaProvisioner::provision`]
//! again. There is no rollback of schema creation on failure.

use chrono::Utc;
use sqlx::postgres::PgPool;
use tracing::{error, info, warn};

use strata_core::error::{StrataError, StrataResult};
use strata_core::models::schema_record::{MigrationStatus, SchemaRecord};
use strata_core::models::tenant::Tenant;
use strata_core::repository::{SchemaRecordRepository, TenantRepository};

use crate::error::DbError;
use crate::migrations::{self, Migration};

/// Deterministic schema name for a tenant: the name lower-cased with
/// every character outside `[a-z0-9]` replaced by `_`, behind a fixed
/// prefix. The same tenant always maps to the same schema.
pub fn schema_name(prefix: &str, tenant_name: &str) -> String {
    let slug: String = tenant_name
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{prefix}{slug}")
}

/// Provisions and migrates tenant schemas, recording outcomes in the
/// schema-provenance table.
pub struct SchemaProvisioner<S: SchemaRecordRepository> {
    pool: PgPool,
    records: S,
    service_name: String,
    schema_prefix: String,
}

impl<S: SchemaRecordRepository> SchemaProvisioner<S> {
    pub fn new(pool: PgPool, records: S, service_name: impl Into<String>) -> Self {
        Self {
            pool,
            records,
            service_name: service_name.into(),
            schema_prefix: "tenant_".into(),
        }
    }

    /// The service's own baseline schema (users, refresh tokens).
    /// Kept equal to the service name; both live outside any tenant
    /// schema.
    pub fn service_schema(&self) -> &str {
        &self.service_name
    }

    /// Ensure the tenant's schema exists, is fully migrated, and is
    /// recorded as provisioned. Idempotent: a second call is a no-op
    /// that returns the same record. Safe to call concurrently for
    /// different tenants; concurrent calls for the *same* tenant are
    /// redundant idempotent work, not a race.
    pub async fn provision(&self, tenant: &Tenant) -> StrataResult<SchemaRecord> {
        let schema = schema_name(&self.schema_prefix, &tenant.name);

        // 1. Create the schema if absent.
        self.create_schema(&schema).await?;

        // 2. Apply outstanding tenant migrations.
        let version = match migrations::apply(&self.pool, &schema, migrations::TENANT_MIGRATIONS)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                // Record the observed failure; the schema stays in
                // place for a later idempotent re-run.
                let failed = SchemaRecord {
                    tenant_id: tenant.id,
                    schema_name: schema.clone(),
                    service_name: self.service_name.clone(),
                    migration_version: None,
                    migration_status: MigrationStatus::Failed,
                    last_validation_at: Some(Utc::now()),
                };
                if let Err(upsert_err) = self.records.upsert(failed).await {
                    warn!(error = %upsert_err, schema, "could not record failed provisioning");
                }
                return Err(StrataError::Provisioning {
                    message: format!("migrating schema {schema}: {e}"),
                });
            }
        };

        // 3. Record the outcome.
        let record = SchemaRecord {
            tenant_id: tenant.id,
            schema_name: schema.clone(),
            service_name: self.service_name.clone(),
            migration_version: version,
            migration_status: MigrationStatus::Completed,
            last_validation_at: Some(Utc::now()),
        };
        self.records.upsert(record.clone()).await?;

        info!(tenant = %tenant.name, schema, "provisioned tenant schema");
        Ok(record)
    }

    /// Reconcile a tenant schema's migration history against the
    /// embedded set (checksum drift, out-of-order edits). Metadata
    /// only — data tables are never touched.
    pub async fn repair(&self, tenant: &Tenant) -> StrataResult<u64> {
        let schema = schema_name(&self.schema_prefix, &tenant.name);
        let reconciled = migrations::repair(&self.pool, &schema, migrations::TENANT_MIGRATIONS)
            .await
            .map_err(StrataError::from)?;
        if reconciled > 0 {
            warn!(schema, reconciled, "repaired migration history");
        }
        Ok(reconciled)
    }

    /// Service-start bootstrap: the shared `public` registry schema
    /// first, then this service's own baseline schema — a failure in
    /// either is fatal — then every currently-active tenant, where a
    /// single tenant's failure is logged and does not abort the rest.
    pub async fn bootstrap<T: TenantRepository>(&self, tenants: &T) -> StrataResult<()> {
        ensure_locations()?;

        migrations::apply(&self.pool, "public", migrations::PUBLIC_MIGRATIONS)
            .await
            .map_err(|e| StrataError::Provisioning {
                message: format!("public registry schema: {e}"),
            })?;

        let service_schema = self.service_schema().to_string();
        self.create_schema(&service_schema).await?;
        migrations::apply(&self.pool, &service_schema, migrations::SERVICE_MIGRATIONS)
            .await
            .map_err(|e| StrataError::Provisioning {
                message: format!("service baseline schema {service_schema}: {e}"),
            })?;

        let active = tenants.list_active().await?;
        info!(count = active.len(), "provisioning active tenants");
        for tenant in &active {
            if let Err(e) = self.provision(tenant).await {
                error!(tenant = %tenant.name, error = %e, "tenant provisioning failed; continuing");
            }
        }

        Ok(())
    }

    async fn create_schema(&self, schema: &str) -> StrataResult<()> {
        // schema_name() output only contains [a-z0-9_], which the
        // migration runner re-checks before any interpolation.
        sqlx::raw_sql(&format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\""))
            .execute(&self.pool)
            .await
            .map_err(|e| StrataError::from(DbError::from(e)))?;
        Ok(())
    }
}

/// A logical migration location with no migrations at all means the
/// binary was built wrong; abort startup instead of degrading.
fn ensure_locations() -> StrataResult<()> {
    let locations: [(&str, &[Migration]); 3] = [
        ("public", migrations::PUBLIC_MIGRATIONS),
        ("service", migrations::SERVICE_MIGRATIONS),
        ("tenant", migrations::TENANT_MIGRATIONS),
    ];
    for (location, set) in locations {
        if set.is_empty() {
            return Err(StrataError::Configuration {
                message: format!("no migrations embedded for location {location}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names_are_deterministic_and_sanitized() {
        assert_eq!(schema_name("tenant_", "acme"), "tenant_acme");
        assert_eq!(schema_name("tenant_", "Acme Corp"), "tenant_acme_corp");
        assert_eq!(schema_name("tenant_", "acme-1"), "tenant_acme_1");
        assert_eq!(
            schema_name("tenant_", "acme"),
            schema_name("tenant_", "acme")
        );
    }

    #[test]
    fn embedded_locations_are_present() {
        assert!(ensure_locations().is_ok());
    }
}
