//! Tenant domain model.
//!
//! Tenants live in the shared `public` registry schema; all business
//! data for a tenant lives in that tenant's own dedicated schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered tenant.
///
/// Tenants are never physically deleted — `active` is flipped by
/// deactivate/reactivate operations and every resolution path filters
/// on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Human-readable unique name; also the subdomain label.
    pub name: String,
    /// Derived subdomain (e.g. `acme.example.com`).
    pub domain: Option<String>,
    pub active: bool,
    /// Commercial plan label (registry metadata, not enforced here).
    pub plan: Option<String>,
    pub max_users: Option<i32>,
    pub owner_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub domain: Option<String>,
    pub plan: Option<String>,
    pub max_users: Option<i32>,
    pub owner_email: Option<String>,
}

/// The resolved tenant identity carried through a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInfo {
    pub id: Uuid,
    pub name: String,
}

impl From<&Tenant> for TenantInfo {
    fn from(t: &Tenant) -> Self {
        TenantInfo {
            id: t.id,
            name: t.name.clone(),
        }
    }
}

/// An explicit tenant reference from a request header, parsed once
/// into a tagged variant instead of branching on parse exceptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantRef {
    ById(Uuid),
    ByName(String),
}

impl TenantRef {
    /// Parse a raw header value: a well-formed UUID is an id
    /// reference, anything else is treated as a tenant name.
    pub fn parse(raw: &str) -> TenantRef {
        match Uuid::parse_str(raw) {
            Ok(id) => TenantRef::ById(id),
            Err(_) => TenantRef::ByName(raw.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_header_parses_as_id() {
        let id = Uuid::new_v4();
        assert_eq!(TenantRef::parse(&id.to_string()), TenantRef::ById(id));
    }

    #[test]
    fn non_uuid_header_parses_as_name() {
        assert_eq!(
            TenantRef::parse("acme"),
            TenantRef::ByName("acme".to_string())
        );
    }
}
