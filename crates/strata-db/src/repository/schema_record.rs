//! Postgres implementation of [`SchemaRecordRepository`].

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use strata_core::error::StrataResult;
use strata_core::models::schema_record::{MigrationStatus, SchemaRecord};
use strata_core::repository::SchemaRecordRepository;

use crate::error::DbError;

#[derive(Debug, sqlx::FromRow)]
struct SchemaRecordRow {
    tenant_id: Uuid,
    schema_name: String,
    service_name: String,
    migration_version: Option<String>,
    migration_status: String,
    last_validation_at: Option<DateTime<Utc>>,
}

impl SchemaRecordRow {
    fn into_record(self) -> Result<SchemaRecord, DbError> {
        let status = MigrationStatus::parse(&self.migration_status).ok_or_else(|| {
            DbError::Migration(format!(
                "unknown migration status {:?} for schema {}",
                self.migration_status, self.schema_name
            ))
        })?;
        Ok(SchemaRecord {
            tenant_id: self.tenant_id,
            schema_name: self.schema_name,
            service_name: self.service_name,
            migration_version: self.migration_version,
            migration_status: status,
            last_validation_at: self.last_validation_at,
        })
    }
}

const COLUMNS: &str = "tenant_id, schema_name, service_name, migration_version, \
                       migration_status, last_validation_at";

/// Schema-provenance bookkeeping in `public.tenant_schemas`.
#[derive(Clone)]
pub struct PgSchemaRecordRepository {
    pool: PgPool,
}

impl PgSchemaRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SchemaRecordRepository for PgSchemaRecordRepository {
    async fn upsert(&self, record: SchemaRecord) -> StrataResult<()> {
        sqlx::query(
            "INSERT INTO public.tenant_schemas \
             (tenant_id, schema_name, service_name, migration_version, migration_status, \
              last_validation_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (tenant_id, service_name) DO UPDATE SET \
             schema_name = EXCLUDED.schema_name, \
             migration_version = EXCLUDED.migration_version, \
             migration_status = EXCLUDED.migration_status, \
             last_validation_at = EXCLUDED.last_validation_at",
        )
        .bind(record.tenant_id)
        .bind(&record.schema_name)
        .bind(&record.service_name)
        .bind(&record.migration_version)
        .bind(record.migration_status.as_str())
        .bind(record.last_validation_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(())
    }

    async fn get(&self, tenant_id: Uuid, service_name: &str) -> StrataResult<SchemaRecord> {
        let row = sqlx::query_as::<_, SchemaRecordRow>(&format!(
            "SELECT {COLUMNS} FROM public.tenant_schemas \
             WHERE tenant_id = $1 AND service_name = $2"
        ))
        .bind(tenant_id)
        .bind(service_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_lookup(e, "schema_record", tenant_id))?;

        Ok(row.into_record()?)
    }

    async fn list_for_service(&self, service_name: &str) -> StrataResult<Vec<SchemaRecord>> {
        let rows = sqlx::query_as::<_, SchemaRecordRow>(&format!(
            "SELECT {COLUMNS} FROM public.tenant_schemas WHERE service_name = $1"
        ))
        .bind(service_name)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        rows.into_iter()
            .map(|r| r.into_record().map_err(Into::into))
            .collect()
    }
}
