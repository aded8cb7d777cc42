//! HTTP handlers and router assembly.
//!
//! This layer is deliberately thin: request shapes in, service calls,
//! response shapes out. Tenant identity arrives through the pipeline
//! in `middleware`, never from handler parameters.

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::middleware as axum_middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use strata_auth::password;
use strata_core::TenantContext;
use strata_core::error::StrataError;
use strata_core::models::tenant::{CreateTenant, Tenant, TenantRef};
use strata_core::models::user::CreateUser;
use strata_core::repository::{TenantRepository, UserRepository};
use strata_core::validation::{ensure_user_capacity, validate_tenant_header};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, tenant_pipeline};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/tenants", post(create_tenant))
        .route("/api/tenants/:id", get(get_tenant))
        .route("/api/tenants/:id/deactivate", put(deactivate_tenant))
        .route("/api/tenants/:id/reactivate", put(reactivate_tenant))
        .route("/api/me", get(me))
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            tenant_pipeline,
        ))
        .with_state(state)
}

// -----------------------------------------------------------------------
// Health
// -----------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// -----------------------------------------------------------------------
// Auth
// -----------------------------------------------------------------------

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    expires_in: u64,
}

impl From<strata_auth::service::TokenPair> for TokenPairResponse {
    fn from(pair: strata_auth::service::TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    /// Tenant to join, by id or by name.
    tenant: String,
    username: String,
    email: String,
    password: String,
}

#[derive(Serialize)]
struct RegisterResponse {
    id: Uuid,
    username: String,
    email: String,
    tenant_id: Uuid,
    roles: Vec<String>,
}

/// Self-service registration into an existing tenant. Public path:
/// the tenant reference travels in the body, not through resolution.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<Response> {
    // 1. The tenant reference obeys the same format rules as the
    //    tenant header.
    validate_tenant_header(&body.tenant)?;

    // 2. Only active tenants accept new users.
    let tenant = match TenantRef::parse(&body.tenant) {
        TenantRef::ById(id) => state.tenants.get_active_by_id(id).await?,
        TenantRef::ByName(name) => state.tenants.get_active_by_name(&name).await?,
    };

    // 3. Honor the tenant's seat cap before creating the account.
    ensure_user_capacity(&state.users, &tenant).await?;

    // 4. Create the user with the default role.
    let password_hash = password::hash_password(&body.password)?;
    let user = state
        .users
        .create(CreateUser {
            tenant_id: tenant.id,
            username: body.username,
            email: body.email,
            password_hash,
            roles: vec!["ROLE_USER".into()],
        })
        .await?;

    info!(username = %user.username, tenant = %tenant.name, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            tenant_id: user.tenant_id,
            roles: user.roles,
        }),
    )
        .into_response())
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    let pair = state.tokens.login(&body.username, &body.password).await?;
    Ok(Json(pair.into()))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    let pair = state.tokens.refresh(&body.refresh_token).await?;
    Ok(Json(pair.into()))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<StatusCode> {
    state.tokens.logout(&body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------
// Tenant lifecycle
// -----------------------------------------------------------------------

#[derive(Deserialize)]
struct CreateTenantRequest {
    name: String,
    plan: Option<String>,
    max_users: Option<i32>,
    owner_email: Option<String>,
    admin_username: String,
    admin_email: String,
    admin_password: String,
}

/// Register a tenant, provision its schema, and bootstrap its first
/// administrator.
#[axum::debug_handler]
async fn create_tenant(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTenantRequest>,
) -> ApiResult<Response> {
    // 1. The tenant name doubles as subdomain label and schema slug;
    //    the header format rules apply to it verbatim.
    validate_tenant_header(&body.name)?;

    // 2. Register the tenant in the shared registry.
    let tenant = state
        .tenants
        .create(CreateTenant {
            name: body.name.clone(),
            domain: Some(format!("{}.{}", body.name, state.base_domain)),
            plan: body.plan,
            max_users: body.max_users,
            owner_email: body.owner_email,
        })
        .await?;

    // 3. Provision the tenant's schema. The tenant row stays in place
    //    on failure; provisioning is idempotent and retried on the
    //    next startup or create call.
    state.provisioner.provision(&tenant).await?;

    // 4. Bootstrap the tenant administrator.
    let password_hash = password::hash_password(&body.admin_password)?;
    state
        .users
        .create(CreateUser {
            tenant_id: tenant.id,
            username: body.admin_username,
            email: body.admin_email,
            password_hash,
            roles: vec!["ROLE_TENANT_ADMIN".into(), "ROLE_USER".into()],
        })
        .await?;

    info!(tenant = %tenant.name, id = %tenant.id, "tenant created");
    Ok((StatusCode::CREATED, Json(tenant)).into_response())
}

async fn get_tenant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.tenants.get_by_id(id).await?))
}

async fn deactivate_tenant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.tenants.set_active(id, false).await?;
    info!(%id, "tenant deactivated");
    Ok(StatusCode::NO_CONTENT)
}

async fn reactivate_tenant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.tenants.set_active(id, true).await?;
    info!(%id, "tenant reactivated");
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------
// Current user
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct MeResponse {
    id: Uuid,
    username: String,
    email: String,
    roles: Vec<String>,
    tenant_id: Uuid,
    tenant_name: Option<String>,
}

async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        roles: user.roles,
        tenant_id: user.tenant_id,
        tenant_name: TenantContext::current_name(),
    })
}

// -----------------------------------------------------------------------
// Tenant-scoped business data
// -----------------------------------------------------------------------

#[derive(Serialize, sqlx::FromRow)]
struct Contact {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct CreateContactRequest {
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
}

/// Unqualified table names here resolve inside the tenant's schema —
/// the routed connection is the only isolation mechanism in play.
async fn list_contacts(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Contact>>> {
    let mut conn = state.schema_router.connection().await?;
    let contacts: Vec<Contact> = sqlx::query_as(
        "SELECT id, first_name, last_name, email, phone, created_at \
         FROM contacts ORDER BY last_name, first_name",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| ApiError(StrataError::Database(e.to_string())))?;
    Ok(Json(contacts))
}

async fn create_contact(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateContactRequest>,
) -> ApiResult<Response> {
    let mut conn = state.schema_router.connection().await?;
    let contact: Contact = sqlx::query_as(
        "INSERT INTO contacts (id, first_name, last_name, email, phone) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, first_name, last_name, email, phone, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.email)
    .bind(&body.phone)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| ApiError(StrataError::Database(e.to_string())))?;
    Ok((StatusCode::CREATED, Json(contact)).into_response())
}

