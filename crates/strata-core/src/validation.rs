//! Format and capacity validation for tenant-scoped input.

use crate::error::StrataError;
use crate::models::tenant::Tenant;
use crate::repository::UserRepository;

const MIN_TENANT_HEADER_LEN: usize = 3;
const MAX_TENANT_HEADER_LEN: usize = 50;

/// Validate an explicit tenant header value: 3–50 characters, ASCII
/// letters, digits, hyphens and underscores only.
///
/// This accepts both UUIDs and tenant names; it exists to reject
/// obviously malformed input before any registry lookup.
pub fn validate_tenant_header(value: &str) -> Result<(), StrataError> {
    if value.len() < MIN_TENANT_HEADER_LEN || value.len() > MAX_TENANT_HEADER_LEN {
        return Err(StrataError::InvalidFormat {
            message: format!(
                "tenant header must be between {MIN_TENANT_HEADER_LEN} and \
                 {MAX_TENANT_HEADER_LEN} characters"
            ),
        });
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StrataError::InvalidFormat {
            message: "tenant header may only contain letters, digits, hyphens and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Enforce the tenant's `max_users` cap before creating another user.
/// Tenants without a cap are unlimited.
pub async fn ensure_user_capacity<U: UserRepository>(
    users: &U,
    tenant: &Tenant,
) -> Result<(), StrataError> {
    let Some(limit) = tenant.max_users else {
        return Ok(());
    };
    let current = users.count_by_tenant(tenant.id).await?;
    if current >= limit.max(0) as u64 {
        return Err(StrataError::LimitExceeded {
            entity: "user".into(),
            limit,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_short_is_rejected() {
        assert!(validate_tenant_header("ab").is_err());
    }

    #[test]
    fn valid_slug_is_accepted() {
        assert!(validate_tenant_header("acme-1").is_ok());
    }

    #[test]
    fn invalid_charset_is_rejected() {
        assert!(validate_tenant_header("acme!").is_err());
    }

    #[test]
    fn uuid_is_accepted() {
        assert!(validate_tenant_header("7f8a1f9c-2a77-4f3e-9a21-0c5b8f1e4d22").is_ok());
    }

    #[test]
    fn over_fifty_chars_is_rejected() {
        assert!(validate_tenant_header(&"a".repeat(51)).is_err());
        assert!(validate_tenant_header(&"a".repeat(50)).is_ok());
    }
}
