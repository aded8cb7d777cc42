//! Integration tests for the token service.

use chrono::Utc;
use strata_auth::config::AuthConfig;
use strata_auth::service::TokenService;
use strata_auth::{password, token};
use strata_core::error::StrataError;
use strata_core::models::refresh_token::CreateRefreshToken;
use strata_core::models::tenant::CreateTenant;
use strata_core::models::user::{CreateUser, User};
use strata_core::repository::{RefreshTokenRepository, TenantRepository, UserRepository};
use strata_db::repository::memory::{
    InMemoryRefreshTokenRepository, InMemoryTenantRepository, InMemoryUserRepository,
};
use uuid::Uuid;

const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";

fn test_config() -> AuthConfig {
    AuthConfig {
        secret: TEST_SECRET.into(),
        issuer: "strata-test".into(),
        access_token_ttl_secs: 1800,
        refresh_token_ttl_secs: 604_800,
    }
}

type MemoryTokenService = TokenService<
    InMemoryUserRepository,
    InMemoryRefreshTokenRepository,
    InMemoryTenantRepository,
>;

/// Create a service plus one enabled user in tenant "acme" with a
/// known password.
async fn setup() -> (
    MemoryTokenService,
    InMemoryUserRepository,
    InMemoryRefreshTokenRepository,
    User,
) {
    let tenant_repo = InMemoryTenantRepository::new();
    let user_repo = InMemoryUserRepository::new();
    let token_repo = InMemoryRefreshTokenRepository::new();

    let tenant = tenant_repo
        .create(CreateTenant {
            name: "acme".into(),
            domain: None,
            plan: None,
            max_users: None,
            owner_email: None,
        })
        .await
        .unwrap();

    let user = user_repo
        .create(CreateUser {
            tenant_id: tenant.id,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: password::hash_password("correct-horse-battery").unwrap(),
            roles: vec!["ROLE_USER".into()],
        })
        .await
        .unwrap();

    let svc = TokenService::new(
        user_repo.clone(),
        token_repo.clone(),
        tenant_repo,
        test_config(),
    );
    (svc, user_repo, token_repo, user)
}

#[tokio::test]
async fn access_token_roundtrip_validates() {
    let (svc, _, _, user) = setup().await;

    let access = svc.issue_access_token(&user, Some("acme".into())).unwrap();
    assert!(svc.validate_access_token(&access, &user));
}

#[tokio::test]
async fn tenant_mismatch_is_a_hard_rejection() {
    let (svc, _, _, alice) = setup().await;

    // Same subject, different tenant. The token must not validate
    // even though signature, expiry and subject all line up.
    let impostor = User {
        tenant_id: Uuid::new_v4(),
        ..alice.clone()
    };

    let access = svc.issue_access_token(&alice, None).unwrap();
    assert!(svc.validate_access_token(&access, &alice));
    assert!(!svc.validate_access_token(&access, &impostor));
}

#[tokio::test]
async fn wrong_subject_is_rejected() {
    let (svc, _, _, alice) = setup().await;
    let mut carol = alice.clone();
    carol.username = "carol".into();

    let access = svc.issue_access_token(&alice, None).unwrap();
    assert!(!svc.validate_access_token(&access, &carol));
}

#[tokio::test]
async fn malformed_access_token_is_false_not_an_error() {
    let (svc, _, _, user) = setup().await;
    assert!(!svc.validate_access_token("garbage", &user));
    assert!(!svc.validate_access_token("", &user));
}

#[tokio::test]
async fn refresh_rotation_invalidates_prior_token() {
    let (svc, _, _, user) = setup().await;

    let first = svc.issue_refresh_token(&user).await.unwrap();
    assert!(svc.validate_refresh_token(&first).await);

    let second = svc.issue_refresh_token(&user).await.unwrap();
    assert!(!svc.validate_refresh_token(&first).await);
    assert!(svc.validate_refresh_token(&second).await);
}

#[tokio::test]
async fn persisted_expiry_is_authoritative() {
    let (svc, _, token_repo, user) = setup().await;

    // Embedded expiry is fine; the store-side expiry has passed.
    let raw = svc.issue_refresh_token(&user).await.unwrap();
    token_repo.expire_now(&token::hash_token(&raw));

    assert!(!svc.validate_refresh_token(&raw).await);
}

#[tokio::test]
async fn embedded_expiry_is_checked_even_with_a_live_record() {
    let (svc, _, token_repo, user) = setup().await;

    // A token whose embedded expiry passed long ago, paired with a
    // deliberately live persisted record: still invalid. Expiry is
    // well past the decoder's clock-skew leeway.
    let now = Utc::now().timestamp();
    let claims = serde_json::json!({
        "sub": user.id.to_string(),
        "iss": "strata-test",
        "iat": now - 7200,
        "exp": now - 3600,
        "jti": Uuid::new_v4().to_string(),
    });
    let key = jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes());
    let stale = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &key,
    )
    .unwrap();
    token_repo
        .create(CreateRefreshToken {
            token_hash: token::hash_token(&stale),
            user_id: user.id,
            expires_at: Utc::now() + chrono::Duration::days(7),
        })
        .await
        .unwrap();

    assert!(!svc.validate_refresh_token(&stale).await);
}

#[tokio::test]
async fn revoke_is_idempotent() {
    let (svc, _, _, user) = setup().await;

    let raw = svc.issue_refresh_token(&user).await.unwrap();
    svc.revoke(&raw).await.unwrap();
    assert!(!svc.validate_refresh_token(&raw).await);

    // Second revocation of the same token, and one of a token that
    // never existed: both no-ops.
    svc.revoke(&raw).await.unwrap();
    svc.revoke("never-issued").await.unwrap();
    assert!(!svc.validate_refresh_token(&raw).await);
}

#[tokio::test]
async fn login_issues_a_working_pair() {
    let (svc, _, _, user) = setup().await;

    let pair = svc.login("alice", "correct-horse-battery").await.unwrap();
    assert!(svc.validate_access_token(&pair.access_token, &user));
    assert!(svc.validate_refresh_token(&pair.refresh_token).await);
    assert_eq!(pair.expires_in, 1800);
}

#[tokio::test]
async fn login_tokens_carry_the_tenant_name() {
    let (svc, _, _, user) = setup().await;

    let pair = svc.login("alice", "correct-horse-battery").await.unwrap();
    let claims = token::decode_access_token(&pair.access_token, &test_config()).unwrap();
    assert_eq!(claims.tenant_id, user.tenant_id.to_string());
    assert_eq!(claims.tenant_name.as_deref(), Some("acme"));
}

#[tokio::test]
async fn login_rejects_bad_password_and_unknown_user() {
    let (svc, _, _, _) = setup().await;

    assert!(matches!(
        svc.login("alice", "wrong").await,
        Err(StrataError::Unauthorized { .. })
    ));
    assert!(matches!(
        svc.login("nobody", "whatever").await,
        Err(StrataError::Unauthorized { .. })
    ));
}

#[tokio::test]
async fn disabled_user_cannot_login_or_refresh() {
    let (svc, user_repo, _, user) = setup().await;

    let pair = svc.login("alice", "correct-horse-battery").await.unwrap();
    user_repo.set_enabled(user.id, false);

    assert!(svc.login("alice", "correct-horse-battery").await.is_err());
    assert!(svc.refresh(&pair.refresh_token).await.is_err());
}

#[tokio::test]
async fn refresh_rotates_and_old_token_dies() {
    let (svc, _, _, user) = setup().await;

    let pair = svc.login("alice", "correct-horse-battery").await.unwrap();
    let rotated = svc.refresh(&pair.refresh_token).await.unwrap();

    assert!(!svc.validate_refresh_token(&pair.refresh_token).await);
    assert!(svc.validate_refresh_token(&rotated.refresh_token).await);
    assert!(svc.validate_access_token(&rotated.access_token, &user));
}

#[tokio::test]
async fn logout_revokes_the_presented_token() {
    let (svc, _, _, _) = setup().await;

    let pair = svc.login("alice", "correct-horse-battery").await.unwrap();
    svc.logout(&pair.refresh_token).await.unwrap();
    assert!(!svc.validate_refresh_token(&pair.refresh_token).await);
    assert!(svc.refresh(&pair.refresh_token).await.is_err());
}

#[tokio::test]
async fn concurrent_refresh_is_last_writer_wins() {
    let (svc, _, _, user) = setup().await;

    let pair = svc.login("alice", "correct-horse-battery").await.unwrap();

    // Two sequential rotations from the same starting token mirror the
    // accepted race: whichever issuance runs last owns the only live
    // token. The second call fails because the first already revoked
    // the shared input.
    let a = svc.refresh(&pair.refresh_token).await;
    let b = svc.refresh(&pair.refresh_token).await;
    assert!(a.is_ok());
    assert!(b.is_err());

    // Issuing directly (the generate-then-revoke path) always leaves
    // exactly one live token — the last writer's.
    let t1 = svc.issue_refresh_token(&user).await.unwrap();
    let t2 = svc.issue_refresh_token(&user).await.unwrap();
    assert!(!svc.validate_refresh_token(&t1).await);
    assert!(svc.validate_refresh_token(&t2).await);
}
