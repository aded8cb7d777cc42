//! Semantics of the in-memory repositories: uniqueness, active
//! filtering, idempotent revocation, provenance upserts.

use chrono::{Duration, Utc};
use strata_core::error::StrataError;
use strata_core::models::refresh_token::CreateRefreshToken;
use strata_core::models::schema_record::{MigrationStatus, SchemaRecord};
use strata_core::models::tenant::CreateTenant;
use strata_core::models::user::CreateUser;
use strata_core::repository::{
    RefreshTokenRepository, SchemaRecordRepository, TenantRepository, UserRepository,
};
use strata_core::validation::ensure_user_capacity;
use strata_db::repository::memory::{
    InMemoryRefreshTokenRepository, InMemorySchemaRecordRepository, InMemoryTenantRepository,
    InMemoryUserRepository,
};
use uuid::Uuid;

fn create_tenant(name: &str) -> CreateTenant {
    CreateTenant {
        name: name.into(),
        domain: None,
        plan: None,
        max_users: None,
        owner_email: None,
    }
}

#[tokio::test]
async fn tenant_names_are_unique() {
    let repo = InMemoryTenantRepository::new();
    repo.create(create_tenant("acme")).await.unwrap();
    assert!(repo.create(create_tenant("acme")).await.is_err());
}

#[tokio::test]
async fn deactivate_and_reactivate() {
    let repo = InMemoryTenantRepository::new();
    let tenant = repo.create(create_tenant("acme")).await.unwrap();

    repo.set_active(tenant.id, false).await.unwrap();
    assert!(repo.get_active_by_id(tenant.id).await.is_err());
    assert!(repo.get_by_id(tenant.id).await.is_ok());
    assert!(repo.list_active().await.unwrap().is_empty());

    repo.set_active(tenant.id, true).await.unwrap();
    assert!(repo.get_active_by_id(tenant.id).await.is_ok());
}

#[tokio::test]
async fn user_uniqueness_and_tenant_count() {
    let repo = InMemoryUserRepository::new();
    let tenant_id = Uuid::new_v4();

    repo.create(CreateUser {
        tenant_id,
        username: "alice".into(),
        email: "alice@example.com".into(),
        password_hash: "x".into(),
        roles: vec!["ROLE_USER".into()],
    })
    .await
    .unwrap();

    let dup = repo
        .create(CreateUser {
            tenant_id,
            username: "alice".into(),
            email: "other@example.com".into(),
            password_hash: "x".into(),
            roles: vec![],
        })
        .await;
    assert!(dup.is_err());

    assert_eq!(repo.count_by_tenant(tenant_id).await.unwrap(), 1);
    assert_eq!(repo.count_by_tenant(Uuid::new_v4()).await.unwrap(), 0);
}

#[tokio::test]
async fn user_cap_blocks_creation_once_full() {
    let tenants = InMemoryTenantRepository::new();
    let users = InMemoryUserRepository::new();

    let capped = tenants
        .create(CreateTenant {
            max_users: Some(1),
            ..create_tenant("capped")
        })
        .await
        .unwrap();
    let unlimited = tenants.create(create_tenant("unlimited")).await.unwrap();

    // One seat free, then full.
    ensure_user_capacity(&users, &capped).await.unwrap();
    users
        .create(CreateUser {
            tenant_id: capped.id,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
            roles: vec!["ROLE_USER".into()],
        })
        .await
        .unwrap();
    assert!(matches!(
        ensure_user_capacity(&users, &capped).await,
        Err(StrataError::LimitExceeded { limit: 1, .. })
    ));

    // No cap means no limit; other tenants' users never count.
    ensure_user_capacity(&users, &unlimited).await.unwrap();
}

#[tokio::test]
async fn revoke_all_spares_other_users() {
    let repo = InMemoryRefreshTokenRepository::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::days(7);

    for (user, hash) in [(alice, "a1"), (alice, "a2"), (bob, "b1")] {
        repo.create(CreateRefreshToken {
            token_hash: hash.into(),
            user_id: user,
            expires_at,
        })
        .await
        .unwrap();
    }

    assert_eq!(repo.revoke_all_for_user(alice).await.unwrap(), 2);
    assert!(repo.get_by_hash("a1").await.unwrap().revoked);
    assert!(repo.get_by_hash("a2").await.unwrap().revoked);
    assert!(!repo.get_by_hash("b1").await.unwrap().revoked);

    // Second pass revokes nothing further.
    assert_eq!(repo.revoke_all_for_user(alice).await.unwrap(), 0);
}

#[tokio::test]
async fn revoking_unknown_hash_is_a_noop() {
    let repo = InMemoryRefreshTokenRepository::new();
    assert!(repo.revoke_by_hash("never-seen").await.is_ok());
}

#[tokio::test]
async fn schema_record_upsert_replaces_by_tenant_and_service() {
    let repo = InMemorySchemaRecordRepository::new();
    let tenant_id = Uuid::new_v4();

    let pending = SchemaRecord {
        tenant_id,
        schema_name: "tenant_acme".into(),
        service_name: "auth".into(),
        migration_version: None,
        migration_status: MigrationStatus::Pending,
        last_validation_at: None,
    };
    repo.upsert(pending).await.unwrap();

    let completed = SchemaRecord {
        tenant_id,
        schema_name: "tenant_acme".into(),
        service_name: "auth".into(),
        migration_version: Some("V2".into()),
        migration_status: MigrationStatus::Completed,
        last_validation_at: Some(Utc::now()),
    };
    repo.upsert(completed).await.unwrap();

    let stored = repo.get(tenant_id, "auth").await.unwrap();
    assert_eq!(stored.migration_status, MigrationStatus::Completed);
    assert_eq!(stored.migration_version.as_deref(), Some("V2"));
    assert_eq!(repo.list_for_service("auth").await.unwrap().len(), 1);
}
