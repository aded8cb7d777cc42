//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The tenant registry and
//! schema-provenance tables live in the shared `public` schema; users
//! and refresh tokens live in the service's own baseline schema.

use uuid::Uuid;

use crate::error::StrataResult;
use crate::models::{
    refresh_token::{CreateRefreshToken, RefreshToken},
    schema_record::SchemaRecord,
    tenant::{CreateTenant, Tenant},
    user::{CreateUser, User},
};

/// Access to the shared tenant registry.
pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = StrataResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StrataResult<Tenant>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = StrataResult<Tenant>> + Send;
    /// Like `get_by_id`, but an inactive tenant is `NotFound`.
    fn get_active_by_id(&self, id: Uuid) -> impl Future<Output = StrataResult<Tenant>> + Send;
    /// Like `get_by_name`, but an inactive tenant is `NotFound`.
    fn get_active_by_name(&self, name: &str)
    -> impl Future<Output = StrataResult<Tenant>> + Send;
    fn list_active(&self) -> impl Future<Output = StrataResult<Vec<Tenant>>> + Send;
    fn set_active(&self, id: Uuid, active: bool) -> impl Future<Output = StrataResult<()>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = StrataResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StrataResult<User>> + Send;
    fn get_by_username(&self, username: &str)
    -> impl Future<Output = StrataResult<User>> + Send;
    fn count_by_tenant(&self, tenant_id: Uuid) -> impl Future<Output = StrataResult<u64>> + Send;
}

pub trait RefreshTokenRepository: Send + Sync {
    fn create(
        &self,
        input: CreateRefreshToken,
    ) -> impl Future<Output = StrataResult<RefreshToken>> + Send;
    fn get_by_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = StrataResult<RefreshToken>> + Send;
    /// Mark a token revoked. Unknown or already-revoked hashes are a
    /// no-op, not an error.
    fn revoke_by_hash(&self, token_hash: &str) -> impl Future<Output = StrataResult<()>> + Send;
    /// Revoke every non-revoked token belonging to a user. Returns the
    /// number of tokens revoked.
    fn revoke_all_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = StrataResult<u64>> + Send;
}

/// Schema-provenance bookkeeping, one row per (tenant, service).
pub trait SchemaRecordRepository: Send + Sync {
    fn upsert(&self, record: SchemaRecord) -> impl Future<Output = StrataResult<()>> + Send;
    fn get(
        &self,
        tenant_id: Uuid,
        service_name: &str,
    ) -> impl Future<Output = StrataResult<SchemaRecord>> + Send;
    fn list_for_service(
        &self,
        service_name: &str,
    ) -> impl Future<Output = StrataResult<Vec<SchemaRecord>>> + Send;
}
