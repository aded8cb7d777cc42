//! Shared application state.

use std::sync::Arc;

use sqlx::postgres::PgPool;

use strata_auth::config::AuthConfig;
use strata_auth::service::TokenService;
use strata_core::TenantResolver;
use strata_db::repository::{
    PgRefreshTokenRepository, PgSchemaRecordRepository, PgTenantRepository, PgUserRepository,
};
use strata_db::{SchemaProvisioner, SchemaRouter};

use crate::config::ServerConfig;

/// Services and repositories shared by every request handler.
pub struct AppState {
    pub auth: AuthConfig,
    pub base_domain: String,
    pub tenants: PgTenantRepository,
    pub users: PgUserRepository,
    pub resolver: TenantResolver<PgTenantRepository>,
    pub tokens: TokenService<PgUserRepository, PgRefreshTokenRepository, PgTenantRepository>,
    pub provisioner: SchemaProvisioner<PgSchemaRecordRepository>,
    pub schema_router: SchemaRouter,
}

impl AppState {
    pub fn new(pool: PgPool, config: &ServerConfig) -> Arc<Self> {
        let tenants = PgTenantRepository::new(pool.clone());
        let users = PgUserRepository::new(pool.clone());

        Arc::new(Self {
            auth: config.auth.clone(),
            base_domain: config.base_domain.clone(),
            resolver: TenantResolver::new(tenants.clone(), config.base_domain.clone()),
            tokens: TokenService::new(
                users.clone(),
                PgRefreshTokenRepository::new(pool.clone()),
                tenants.clone(),
                config.auth.clone(),
            ),
            provisioner: SchemaProvisioner::new(
                pool.clone(),
                PgSchemaRecordRepository::new(pool.clone()),
                "auth",
            ),
            schema_router: SchemaRouter::new(pool),
            tenants,
            users,
        })
    }
}
