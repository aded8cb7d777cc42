//! HS256 JWT encoding/decoding for access and refresh tokens.
//!
//! Access tokens are stateless: validation recomputes the signature
//! and expiry only, no store lookup. Refresh tokens are also signed
//! (the embedded expiry is the fast-path rejection) but carry their
//! authoritative state in the refresh-token table, keyed by the
//! SHA-256 hash of the raw token.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use strata_core::models::user::User;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject — username.
    pub sub: String,
    /// Tenant ID (UUID string) the token was minted under.
    pub tenant_id: String,
    /// Tenant display name, when known at issue time.
    pub tenant_name: Option<String>,
    /// Role names granted to the subject.
    pub roles: Vec<String>,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

/// JWT claims embedded in every refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject — user ID (UUID string).
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Issue a signed HS256 access token for a user.
pub fn issue_access_token(
    user: &User,
    tenant_name: Option<String>,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        sub: user.username.clone(),
        tenant_id: user.tenant_id.to_string(),
        tenant_name,
        roles: user.roles.clone(),
        iss: config.issuer.clone(),
        iat: now,
        exp: now + config.access_token_ttl_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };
    encode(&claims, config)
}

/// Decode and verify an HS256 access token.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    decode(token, config)
}

/// Issue a signed HS256 refresh token for a user.
pub fn issue_refresh_token(user_id: Uuid, config: &AuthConfig) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = RefreshTokenClaims {
        sub: user_id.to_string(),
        iss: config.issuer.clone(),
        iat: now,
        exp: now + config.refresh_token_ttl_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };
    encode(&claims, config)
}

/// Decode and verify a refresh token's embedded claims. This is only
/// the fast-path check — the persisted record remains authoritative.
pub fn decode_refresh_token(
    token: &str,
    config: &AuthConfig,
) -> Result<RefreshTokenClaims, AuthError> {
    decode(token, config)
}

/// SHA-256 hash of a raw token, hex-encoded.
///
/// This is the value stored in the database as
/// `refresh_tokens.token_hash`.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

fn encode<C: Serialize>(claims: &C, config: &AuthConfig) -> Result<String, AuthError> {
    let key = EncodingKey::from_secret(config.secret.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

fn decode<C: for<'de> Deserialize<'de>>(token: &str, config: &AuthConfig) -> Result<C, AuthError> {
    let key = DecodingKey::from_secret(config.secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<C>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_config() -> AuthConfig {
        AuthConfig {
            secret: "test-secret-test-secret-test-secret!".into(),
            issuer: "strata-test".into(),
            access_token_ttl_secs: 1800,
            refresh_token_ttl_secs: 604_800,
        }
    }

    fn test_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            enabled: true,
            roles: vec!["ROLE_USER".into()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn access_token_roundtrip() {
        let config = test_config();
        let user = test_user();

        let token = issue_access_token(&user, Some("acme".into()), &config).unwrap();
        let claims = decode_access_token(&token, &config).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.tenant_id, user.tenant_id.to_string());
        assert_eq!(claims.tenant_name.as_deref(), Some("acme"));
        assert_eq!(claims.roles, vec!["ROLE_USER".to_string()]);
        assert_eq!(claims.iss, "strata-test");
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let now = Utc::now().timestamp();
        // Expired beyond the decoder's clock-skew leeway.
        let claims = AccessTokenClaims {
            sub: "alice".into(),
            tenant_id: Uuid::new_v4().to_string(),
            tenant_name: None,
            roles: vec![],
            iss: config.issuer.clone(),
            iat: now - 3600,
            exp: now - 600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&claims, &config).unwrap();

        assert!(matches!(
            decode_access_token(&token, &config),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config();
        let other = AuthConfig {
            secret: "another-secret-another-secret-another".into(),
            ..test_config()
        };
        let token = issue_access_token(&test_user(), None, &config).unwrap();

        assert!(matches!(
            decode_access_token(&token, &other),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn malformed_token_is_invalid_not_a_panic() {
        let config = test_config();
        assert!(matches!(
            decode_access_token("not.a.jwt", &config),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn token_hash_is_stable_and_hex() {
        let h1 = hash_token("some-raw-token");
        let h2 = hash_token("some-raw-token");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, hash_token("another-raw-token"));
    }
}
