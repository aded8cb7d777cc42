//! Postgres implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use strata_core::error::StrataResult;
use strata_core::models::user::{CreateUser, User};
use strata_core::repository::UserRepository;

use crate::error::DbError;

use super::SERVICE_SCHEMA;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    tenant_id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    enabled: bool,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            tenant_id: row.tenant_id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            enabled: row.enabled,
            roles: row.roles,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str =
    "id, tenant_id, username, email, password_hash, enabled, roles, created_at, updated_at";

/// Postgres implementation of the user repository, backed by the
/// service baseline schema.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PgUserRepository {
    async fn create(&self, input: CreateUser) -> StrataResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO {SERVICE_SCHEMA}.users \
             (id, tenant_id, username, email, password_hash, enabled, roles) \
             VALUES ($1, $2, $3, $4, $5, TRUE, $6) \
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.tenant_id)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.roles)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_insert(e, "user"))?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: Uuid) -> StrataResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM {SERVICE_SCHEMA}.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_lookup(e, "user", id))?;

        Ok(row.into())
    }

    async fn get_by_username(&self, username: &str) -> StrataResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM {SERVICE_SCHEMA}.users WHERE username = $1"
        ))
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_lookup(e, "user", username))?;

        Ok(row.into())
    }

    async fn count_by_tenant(&self, tenant_id: Uuid) -> StrataResult<u64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {SERVICE_SCHEMA}.users WHERE tenant_id = $1"
        ))
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(count as u64)
    }
}
