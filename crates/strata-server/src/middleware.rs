//! Per-request tenant and authentication pipeline.
//!
//! Every request runs inside a fresh [`TenantContext::scope`], so a
//! stale tenant from a previous request on the same worker is
//! impossible by construction. Public paths bypass the pipeline
//! entirely; for everything else the order within the scope is fixed:
//! header format validation, tenant resolution, context binding, then
//! bearer authentication with a tenant-claim cross-check.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};
use uuid::Uuid;

use strata_auth::token;
use strata_core::error::StrataError;
use strata_core::repository::UserRepository;
use strata_core::validation::validate_tenant_header;
use strata_core::TenantContext;

use crate::error::ApiError;
use crate::state::AppState;

/// Explicit tenant selection header, used when the host carries no
/// subdomain.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Path prefixes served without authentication or tenant resolution.
const PUBLIC_PATHS: &[&str] = &[
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/refresh",
    "/health",
    "/api/docs",
];

pub(crate) fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS
        .iter()
        .any(|p| path == *p || path.starts_with(&format!("{p}/")))
}

/// The authenticated caller, inserted into request extensions for
/// handlers behind the pipeline.
#[derive(Clone)]
pub struct CurrentUser(pub strata_core::models::user::User);

pub async fn tenant_pipeline(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    // The scope guarantees the context is torn down on every exit
    // path, including panics unwinding through the handler.
    TenantContext::scope(run(state, req, next)).await
}

async fn run(state: Arc<AppState>, mut req: Request, next: Next) -> Response {
    // Public paths bypass the whole tenant/auth pipeline: no header
    // validation, no resolution, no bearer check.
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let tenant_header = req
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // 1. Header format gate: a malformed header is rejected outright,
    //    before any registry lookup.
    let header_value = match tenant_header.as_deref() {
        Some(value) => match validate_tenant_header(value) {
            Ok(()) => Some(value),
            Err(e) => return ApiError(e).into_response(),
        },
        None => None,
    };

    // 2. Resolve and bind the tenant. Resolution failures are storage
    //    problems, not the caller's; log and proceed tenant-less so
    //    tenant-free paths stay available.
    match state.resolver.resolve(&host, header_value).await {
        Ok(Some(info)) => TenantContext::set(info.id, info.name),
        Ok(None) => {}
        Err(e) => warn!(error = %e, host, "tenant resolution failed; proceeding without tenant"),
    }

    // 3. Bearer authentication.
    let Some(raw_token) = bearer_token(&req) else {
        return unauthorized("missing bearer token");
    };

    let claims = match token::decode_access_token(&raw_token, &state.auth) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "access token rejected");
            return unauthorized("invalid access token");
        }
    };

    let user = match state.users.get_by_username(&claims.sub).await {
        Ok(u) => u,
        Err(e) if e.is_not_found() => return unauthorized("unknown subject"),
        Err(e) => return ApiError(e).into_response(),
    };

    if !state.tokens.validate_access_token(&raw_token, &user) {
        return unauthorized("invalid access token");
    }

    // 4. Tenant-claim cross-check: a token minted under one tenant
    //    must never authenticate a request resolved to another.
    match TenantContext::current_id() {
        Some(resolved) if resolved.to_string() != claims.tenant_id => {
            warn!(
                sub = %claims.sub,
                token_tenant = %claims.tenant_id,
                %resolved,
                "token tenant does not match resolved tenant"
            );
            return ApiError::from(strata_auth::AuthError::TenantMismatch).into_response();
        }
        Some(_) => {}
        // No tenant resolved from routing hints: the verified token
        // claim is the identity for the rest of the request.
        None => {
            if let Ok(id) = Uuid::parse_str(&claims.tenant_id) {
                TenantContext::set_id_only(id);
            }
        }
    }

    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn unauthorized(reason: &str) -> Response {
    ApiError(StrataError::Unauthorized {
        reason: reason.to_string(),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_path_matching_is_prefix_based() {
        assert!(is_public_path("/health"));
        assert!(is_public_path("/api/auth/login"));
        assert!(is_public_path("/api/docs/openapi.json"));
        assert!(!is_public_path("/api/tenants"));
        assert!(!is_public_path("/api/auth/logout"));
        // A shared prefix without a path separator is not public.
        assert!(!is_public_path("/healthz"));
    }
}
