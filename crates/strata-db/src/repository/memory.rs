//! In-memory repository implementations.
//!
//! Used by tests and database-less local development; semantics match
//! the Postgres implementations (uniqueness, active filtering,
//! idempotent revocation).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use strata_core::error::{StrataError, StrataResult};
use strata_core::models::refresh_token::{CreateRefreshToken, RefreshToken};
use strata_core::models::schema_record::SchemaRecord;
use strata_core::models::tenant::{CreateTenant, Tenant};
use strata_core::models::user::{CreateUser, User};
use strata_core::repository::{
    RefreshTokenRepository, SchemaRecordRepository, TenantRepository, UserRepository,
};

fn not_found(entity: &str, id: impl ToString) -> StrataError {
    StrataError::NotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

// -----------------------------------------------------------------------
// Tenants
// -----------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryTenantRepository {
    tenants: Arc<Mutex<HashMap<Uuid, Tenant>>>,
}

impl InMemoryTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TenantRepository for InMemoryTenantRepository {
    async fn create(&self, input: CreateTenant) -> StrataResult<Tenant> {
        let mut tenants = self.tenants.lock().unwrap();
        if tenants.values().any(|t| t.name == input.name) {
            return Err(StrataError::AlreadyExists {
                entity: "tenant".into(),
            });
        }
        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: input.name,
            domain: input.domain,
            active: true,
            plan: input.plan,
            max_users: input.max_users,
            owner_email: input.owner_email,
            created_at: now,
            updated_at: now,
        };
        tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn get_by_id(&self, id: Uuid) -> StrataResult<Tenant> {
        self.tenants
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("tenant", id))
    }

    async fn get_by_name(&self, name: &str) -> StrataResult<Tenant> {
        self.tenants
            .lock()
            .unwrap()
            .values()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| not_found("tenant", name))
    }

    async fn get_active_by_id(&self, id: Uuid) -> StrataResult<Tenant> {
        self.tenants
            .lock()
            .unwrap()
            .get(&id)
            .filter(|t| t.active)
            .cloned()
            .ok_or_else(|| not_found("tenant", id))
    }

    async fn get_active_by_name(&self, name: &str) -> StrataResult<Tenant> {
        self.tenants
            .lock()
            .unwrap()
            .values()
            .find(|t| t.name == name && t.active)
            .cloned()
            .ok_or_else(|| not_found("tenant", name))
    }

    async fn list_active(&self) -> StrataResult<Vec<Tenant>> {
        let mut active: Vec<Tenant> = self
            .tenants
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(active)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> StrataResult<()> {
        let mut tenants = self.tenants.lock().unwrap();
        let tenant = tenants.get_mut(&id).ok_or_else(|| not_found("tenant", id))?;
        tenant.active = active;
        tenant.updated_at = Utc::now();
        Ok(())
    }
}

// -----------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: flip the enabled flag on an existing user.
    pub fn set_enabled(&self, id: Uuid, enabled: bool) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.enabled = enabled;
        }
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn create(&self, input: CreateUser) -> StrataResult<User> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.username == input.username || u.email == input.email)
        {
            return Err(StrataError::AlreadyExists {
                entity: "user".into(),
            });
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            username: input.username,
            email: input.email,
            password_hash: input.password_hash,
            enabled: true,
            roles: input.roles,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> StrataResult<User> {
        self.users
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("user", id))
    }

    async fn get_by_username(&self, username: &str) -> StrataResult<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| not_found("user", username))
    }

    async fn count_by_tenant(&self, tenant_id: Uuid) -> StrataResult<u64> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.tenant_id == tenant_id)
            .count() as u64)
    }
}

// -----------------------------------------------------------------------
// Refresh tokens
// -----------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryRefreshTokenRepository {
    tokens: Arc<Mutex<HashMap<String, RefreshToken>>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: force the persisted expiry of a token into the
    /// past without touching its embedded expiry.
    pub fn expire_now(&self, token_hash: &str) {
        if let Some(token) = self.tokens.lock().unwrap().get_mut(token_hash) {
            token.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
    }
}

impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn create(&self, input: CreateRefreshToken) -> StrataResult<RefreshToken> {
        let mut tokens = self.tokens.lock().unwrap();
        if tokens.contains_key(&input.token_hash) {
            return Err(StrataError::AlreadyExists {
                entity: "refresh_token".into(),
            });
        }
        let token = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: input.token_hash.clone(),
            user_id: input.user_id,
            expires_at: input.expires_at,
            revoked: false,
            created_at: Utc::now(),
        };
        tokens.insert(input.token_hash, token.clone());
        Ok(token)
    }

    async fn get_by_hash(&self, token_hash: &str) -> StrataResult<RefreshToken> {
        self.tokens
            .lock()
            .unwrap()
            .get(token_hash)
            .cloned()
            .ok_or_else(|| not_found("refresh_token", "<hash>"))
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> StrataResult<()> {
        if let Some(token) = self.tokens.lock().unwrap().get_mut(token_hash) {
            token.revoked = true;
        }
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> StrataResult<u64> {
        let mut revoked = 0u64;
        for token in self.tokens.lock().unwrap().values_mut() {
            if token.user_id == user_id && !token.revoked {
                token.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

// -----------------------------------------------------------------------
// Schema records
// -----------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemorySchemaRecordRepository {
    records: Arc<Mutex<HashMap<(Uuid, String), SchemaRecord>>>,
}

impl InMemorySchemaRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchemaRecordRepository for InMemorySchemaRecordRepository {
    async fn upsert(&self, record: SchemaRecord) -> StrataResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert((record.tenant_id, record.service_name.clone()), record);
        Ok(())
    }

    async fn get(&self, tenant_id: Uuid, service_name: &str) -> StrataResult<SchemaRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(tenant_id, service_name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("schema_record", tenant_id))
    }

    async fn list_for_service(&self, service_name: &str) -> StrataResult<Vec<SchemaRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.service_name == service_name)
            .cloned()
            .collect())
    }
}
