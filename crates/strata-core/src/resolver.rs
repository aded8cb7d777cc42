//! Tenant resolution from request routing hints.
//!
//! A subdomain label wins over an explicit header; lookup misses and
//! inactive tenants resolve to "no tenant", never an error — some
//! paths (system administration, public endpoints) are intentionally
//! tenant-less and the caller decides whether absence is fatal.

use tracing::debug;
use uuid::Uuid;

use crate::error::StrataResult;
use crate::models::tenant::{TenantInfo, TenantRef};
use crate::repository::TenantRepository;

/// Derives a tenant identity from the request host and the explicit
/// tenant header, against the authoritative registry.
///
/// Generic over the repository so the resolver carries no storage
/// dependency.
pub struct TenantResolver<R> {
    repo: R,
    base_domain: String,
}

impl<R: TenantRepository> TenantResolver<R> {
    pub fn new(repo: R, base_domain: impl Into<String>) -> Self {
        Self {
            repo,
            base_domain: base_domain.into(),
        }
    }

    /// Resolve a tenant from the host header and an optional explicit
    /// tenant header value. First match wins:
    ///
    /// 1. a subdomain (more than two dot-labels) is a tenant name;
    /// 2. an explicit header is parsed once — UUID means lookup by
    ///    id, anything else lookup by name;
    /// 3. otherwise no tenant is resolved.
    ///
    /// Only `active` tenants resolve. A registry miss is `Ok(None)`;
    /// storage failures propagate.
    pub async fn resolve(
        &self,
        host: &str,
        header: Option<&str>,
    ) -> StrataResult<Option<TenantInfo>> {
        // Host headers may carry a port (e.g. acme.localhost:8081).
        let hostname = host.split(':').next().unwrap_or(host);
        let labels: Vec<&str> = hostname.split('.').collect();

        if labels.len() > 2 {
            return self.lookup_by_name(labels[0]).await;
        }

        if let Some(raw) = header {
            return match TenantRef::parse(raw) {
                TenantRef::ById(id) => self.lookup_by_id(id).await,
                TenantRef::ByName(name) => self.lookup_by_name(&name).await,
            };
        }

        Ok(None)
    }

    /// The full subdomain for a tenant (`<name>.<base_domain>`), or
    /// `None` if the tenant is unknown or inactive.
    pub async fn tenant_domain(&self, tenant_id: Uuid) -> StrataResult<Option<String>> {
        match self.repo.get_active_by_id(tenant_id).await {
            Ok(t) => Ok(Some(format!("{}.{}", t.name, self.base_domain))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn lookup_by_id(&self, id: Uuid) -> StrataResult<Option<TenantInfo>> {
        match self.repo.get_active_by_id(id).await {
            Ok(t) => Ok(Some(TenantInfo::from(&t))),
            Err(e) if e.is_not_found() => {
                debug!(%id, "no active tenant for id");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup_by_name(&self, name: &str) -> StrataResult<Option<TenantInfo>> {
        match self.repo.get_active_by_name(name).await {
            Ok(t) => Ok(Some(TenantInfo::from(&t))),
            Err(e) if e.is_not_found() => {
                debug!(name, "no active tenant for name");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
