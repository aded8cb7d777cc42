//! Postgres implementation of [`TenantRepository`].

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use strata_core::error::StrataResult;
use strata_core::models::tenant::{CreateTenant, Tenant};
use strata_core::repository::TenantRepository;

use crate::error::DbError;

#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    name: String,
    domain: Option<String>,
    active: bool,
    plan: Option<String>,
    max_users: Option<i32>,
    owner_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.id,
            name: row.name,
            domain: row.domain,
            active: row.active,
            plan: row.plan,
            max_users: row.max_users,
            owner_email: row.owner_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str =
    "id, name, domain, active, plan, max_users, owner_email, created_at, updated_at";

/// Postgres implementation of the tenant registry, backed by the
/// shared `public.tenants` table.
#[derive(Clone)]
pub struct PgTenantRepository {
    pool: PgPool,
}

impl PgTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one(&self, sql: String, bind: BindArg<'_>) -> StrataResult<Tenant> {
        let query = sqlx::query_as::<_, TenantRow>(&sql);
        let query = match bind {
            BindArg::Id(id) => query.bind(id),
            BindArg::Name(name) => query.bind(name),
        };
        let row = query.fetch_one(&self.pool).await.map_err(|e| {
            let id = match bind {
                BindArg::Id(id) => id.to_string(),
                BindArg::Name(name) => name.to_string(),
            };
            DbError::on_lookup(e, "tenant", id)
        })?;
        Ok(row.into())
    }
}

#[derive(Clone, Copy)]
enum BindArg<'a> {
    Id(Uuid),
    Name(&'a str),
}

impl TenantRepository for PgTenantRepository {
    async fn create(&self, input: CreateTenant) -> StrataResult<Tenant> {
        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "INSERT INTO public.tenants (id, name, domain, active, plan, max_users, owner_email) \
             VALUES ($1, $2, $3, TRUE, $4, $5, $6) \
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.domain)
        .bind(&input.plan)
        .bind(input.max_users)
        .bind(&input.owner_email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_insert(e, "tenant"))?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: Uuid) -> StrataResult<Tenant> {
        self.fetch_one(
            format!("SELECT {COLUMNS} FROM public.tenants WHERE id = $1"),
            BindArg::Id(id),
        )
        .await
    }

    async fn get_by_name(&self, name: &str) -> StrataResult<Tenant> {
        self.fetch_one(
            format!("SELECT {COLUMNS} FROM public.tenants WHERE name = $1"),
            BindArg::Name(name),
        )
        .await
    }

    async fn get_active_by_id(&self, id: Uuid) -> StrataResult<Tenant> {
        self.fetch_one(
            format!("SELECT {COLUMNS} FROM public.tenants WHERE id = $1 AND active = TRUE"),
            BindArg::Id(id),
        )
        .await
    }

    async fn get_active_by_name(&self, name: &str) -> StrataResult<Tenant> {
        self.fetch_one(
            format!("SELECT {COLUMNS} FROM public.tenants WHERE name = $1 AND active = TRUE"),
            BindArg::Name(name),
        )
        .await
    }

    async fn list_active(&self) -> StrataResult<Vec<Tenant>> {
        let rows = sqlx::query_as::<_, TenantRow>(&format!(
            "SELECT {COLUMNS} FROM public.tenants WHERE active = TRUE ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> StrataResult<()> {
        let result =
            sqlx::query("UPDATE public.tenants SET active = $1, updated_at = NOW() WHERE id = $2")
                .bind(active)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity: "tenant".into(),
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
