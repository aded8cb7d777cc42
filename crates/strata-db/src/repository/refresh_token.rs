//! Postgres implementation of [`RefreshTokenRepository`].

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use strata_core::error::StrataResult;
use strata_core::models::refresh_token::{CreateRefreshToken, RefreshToken};
use strata_core::repository::RefreshTokenRepository;

use crate::error::DbError;

use super::SERVICE_SCHEMA;

#[derive(Debug, sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    token_hash: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    revoked: bool,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            token_hash: row.token_hash,
            user_id: row.user_id,
            expires_at: row.expires_at,
            revoked: row.revoked,
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str = "id, token_hash, user_id, expires_at, revoked, created_at";

#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn create(&self, input: CreateRefreshToken) -> StrataResult<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            "INSERT INTO {SERVICE_SCHEMA}.refresh_tokens (id, token_hash, user_id, expires_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&input.token_hash)
        .bind(input.user_id)
        .bind(input.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_insert(e, "refresh_token"))?;

        Ok(row.into())
    }

    async fn get_by_hash(&self, token_hash: &str) -> StrataResult<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            "SELECT {COLUMNS} FROM {SERVICE_SCHEMA}.refresh_tokens WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_lookup(e, "refresh_token", "<hash>"))?;

        Ok(row.into())
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> StrataResult<()> {
        // Unknown or already-revoked hashes affect zero rows, which is
        // exactly the idempotent no-op we want.
        sqlx::query(&format!(
            "UPDATE {SERVICE_SCHEMA}.refresh_tokens SET revoked = TRUE WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> StrataResult<u64> {
        let result = sqlx::query(&format!(
            "UPDATE {SERVICE_SCHEMA}.refresh_tokens \
             SET revoked = TRUE WHERE user_id = $1 AND NOT revoked"
        ))
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(result.rows_affected())
    }
}
