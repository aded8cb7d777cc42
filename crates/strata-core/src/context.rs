//! Task-local storage for the current tenant identity.
//!
//! Each request runs inside [`TenantContext::scope`], which installs
//! an empty cell for that task and tears it down on every exit path —
//! success, error return, or panic unwinding through the future. A
//! pooled worker picking up the next request therefore can never
//! observe a previous request's tenant.
//!
//! Propagation to spawned tasks is deliberately explicit: a
//! `tokio::spawn`ed child has no tenant context unless the caller
//! captures the identity and re-scopes it.

use std::cell::RefCell;

use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Slot {
    tenant_id: Option<Uuid>,
    tenant_name: Option<String>,
}

tokio::task_local! {
    static CURRENT_TENANT: RefCell<Slot>;
}

/// The per-request cell holding the currently active tenant identity.
///
/// All accessors are no-ops (with a `warn!`) outside a scope; at most
/// one identity is bound per task at any time.
pub struct TenantContext;

impl TenantContext {
    /// Run `fut` with a fresh, empty tenant cell bound to the current
    /// task. The cell is dropped when `fut` completes or is dropped,
    /// so clearing is guaranteed on all exit paths.
    pub async fn scope<F>(fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(RefCell::new(Slot::default()), fut).await
    }

    /// Bind both tenant id and name for the current task.
    pub fn set(tenant_id: Uuid, tenant_name: impl Into<String>) {
        let name = tenant_name.into();
        if CURRENT_TENANT
            .try_with(|cell| {
                let mut slot = cell.borrow_mut();
                slot.tenant_id = Some(tenant_id);
                slot.tenant_name = Some(name);
            })
            .is_err()
        {
            warn!(%tenant_id, "tenant context set outside of a scope; ignored");
        }
    }

    /// Bind only the tenant id (name unknown, e.g. when derived from
    /// a token claim without a name).
    pub fn set_id_only(tenant_id: Uuid) {
        if CURRENT_TENANT
            .try_with(|cell| {
                let mut slot = cell.borrow_mut();
                slot.tenant_id = Some(tenant_id);
                slot.tenant_name = None;
            })
            .is_err()
        {
            warn!(%tenant_id, "tenant context set outside of a scope; ignored");
        }
    }

    /// The tenant id bound to the current task, if any.
    pub fn current_id() -> Option<Uuid> {
        CURRENT_TENANT
            .try_with(|cell| cell.borrow().tenant_id)
            .unwrap_or(None)
    }

    /// The tenant name bound to the current task, if any.
    pub fn current_name() -> Option<String> {
        CURRENT_TENANT
            .try_with(|cell| cell.borrow().tenant_name.clone())
            .unwrap_or(None)
    }

    /// Unbind the current tenant. Idempotent; a no-op outside a scope.
    pub fn clear() {
        let _ = CURRENT_TENANT.try_with(|cell| {
            let mut slot = cell.borrow_mut();
            slot.tenant_id = None;
            slot.tenant_name = None;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scope_isolates_and_clears() {
        let id = Uuid::new_v4();
        TenantContext::scope(async {
            assert_eq!(TenantContext::current_id(), None);
            TenantContext::set(id, "acme");
            assert_eq!(TenantContext::current_id(), Some(id));
            assert_eq!(TenantContext::current_name().as_deref(), Some("acme"));
        })
        .await;

        // Outside the scope nothing is bound.
        assert_eq!(TenantContext::current_id(), None);
        assert_eq!(TenantContext::current_name(), None);
    }

    #[tokio::test]
    async fn context_cleared_even_when_handler_errors() {
        let id = Uuid::new_v4();
        let result: Result<(), &str> = TenantContext::scope(async {
            TenantContext::set(id, "acme");
            Err("handler failed")
        })
        .await;

        assert!(result.is_err());
        assert_eq!(TenantContext::current_id(), None);
    }

    #[tokio::test]
    async fn sequential_scopes_do_not_leak() {
        let first = Uuid::new_v4();
        TenantContext::scope(async {
            TenantContext::set(first, "first");
        })
        .await;

        TenantContext::scope(async {
            // A fresh scope starts empty, even on the same task.
            assert_eq!(TenantContext::current_id(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn no_implicit_inheritance_into_spawned_tasks() {
        let id = Uuid::new_v4();
        TenantContext::scope(async {
            TenantContext::set(id, "acme");
            let child = tokio::spawn(async { TenantContext::current_id() });
            assert_eq!(child.await.unwrap(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        TenantContext::scope(async {
            TenantContext::set(Uuid::new_v4(), "acme");
            TenantContext::clear();
            TenantContext::clear();
            assert_eq!(TenantContext::current_id(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn set_id_only_drops_stale_name() {
        TenantContext::scope(async {
            TenantContext::set(Uuid::new_v4(), "acme");
            let other = Uuid::new_v4();
            TenantContext::set_id_only(other);
            assert_eq!(TenantContext::current_id(), Some(other));
            assert_eq!(TenantContext::current_name(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn set_outside_scope_is_ignored() {
        TenantContext::set(Uuid::new_v4(), "acme");
        assert_eq!(TenantContext::current_id(), None);
    }
}
