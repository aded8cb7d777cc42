//! Token service — issuance, validation, rotation and revocation of
//! access and refresh tokens, plus login/refresh orchestration.

use chrono::{Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use strata_core::error::{StrataError, StrataResult};
use strata_core::models::refresh_token::CreateRefreshToken;
use strata_core::models::user::User;
use strata_core::repository::{RefreshTokenRepository, TenantRepository, UserRepository};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// A freshly issued access/refresh token pair.
#[derive(Debug)]
pub struct TokenPair {
    /// Signed HS256 access token.
    pub access_token: String,
    /// Raw refresh token (returned to the client, stored hashed).
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Token service.
///
/// Generic over repository implementations so the token layer has no
/// dependency on the database crate.
pub struct TokenService<U: UserRepository, R: RefreshTokenRepository, T: TenantRepository> {
    user_repo: U,
    token_repo: R,
    tenant_repo: T,
    config: AuthConfig,
}

impl<U: UserRepository, R: RefreshTokenRepository, T: TenantRepository> TokenService<U, R, T> {
    pub fn new(user_repo: U, token_repo: R, tenant_repo: T, config: AuthConfig) -> Self {
        Self {
            user_repo,
            token_repo,
            tenant_repo,
            config,
        }
    }

    /// Issue a stateless access token embedding the user's tenant and
    /// roles. Succeeds for any enabled user.
    pub fn issue_access_token(
        &self,
        user: &User,
        tenant_name: Option<String>,
    ) -> StrataResult<String> {
        if !user.enabled {
            return Err(AuthError::AccountDisabled.into());
        }
        token::issue_access_token(user, tenant_name, &self.config).map_err(Into::into)
    }

    /// Issue a new refresh token, revoking every prior refresh token
    /// for the user first (single-active-refresh-token policy).
    ///
    /// Two concurrent calls for the same user each generate-then-revoke
    /// and the winner is unpredictable; last-writer-wins is accepted
    /// here rather than serialized per user.
    pub async fn issue_refresh_token(&self, user: &User) -> StrataResult<String> {
        if !user.enabled {
            return Err(AuthError::AccountDisabled.into());
        }

        let revoked = self.token_repo.revoke_all_for_user(user.id).await?;
        if revoked > 0 {
            debug!(user_id = %user.id, revoked, "rotated out prior refresh tokens");
        }

        let raw = token::issue_refresh_token(user.id, &self.config)?;
        self.token_repo
            .create(CreateRefreshToken {
                token_hash: token::hash_token(&raw),
                user_id: user.id,
                expires_at: Utc::now()
                    + Duration::seconds(self.config.refresh_token_ttl_secs as i64),
            })
            .await?;

        Ok(raw)
    }

    /// Validate an access token against the user performing the call:
    /// signature, expiry, subject, and the tenant claim cross-check
    /// (a token minted under one tenant must never validate for a user
    /// bound to another). Never errors on malformed input.
    pub fn validate_access_token(&self, raw: &str, user: &User) -> bool {
        let claims = match token::decode_access_token(raw, &self.config) {
            Ok(c) => c,
            Err(_) => return false,
        };

        if claims.sub != user.username {
            return false;
        }

        if claims.tenant_id != user.tenant_id.to_string() {
            debug!(
                sub = %claims.sub,
                token_tenant = %claims.tenant_id,
                user_tenant = %user.tenant_id,
                "access token tenant claim mismatch"
            );
            return false;
        }

        true
    }

    /// Validate a refresh token. Both checks are required: the
    /// embedded expiry (fast path) and the persisted record — exists,
    /// not revoked, store-side expiry not passed. The persisted expiry
    /// is authoritative; any divergence between the two is simply
    /// "invalid".
    pub async fn validate_refresh_token(&self, raw: &str) -> bool {
        if token::decode_refresh_token(raw, &self.config).is_err() {
            return false;
        }

        match self.token_repo.get_by_hash(&token::hash_token(raw)).await {
            Ok(record) => !record.revoked && record.expires_at > Utc::now(),
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                warn!(error = %e, "refresh token lookup failed");
                false
            }
        }
    }

    /// Revoke a refresh token. Idempotent: revoking an unknown or
    /// already-revoked token is a no-op.
    pub async fn revoke(&self, raw: &str) -> StrataResult<()> {
        self.token_repo
            .revoke_by_hash(&token::hash_token(raw))
            .await
    }

    /// Authenticate username + password and issue a token pair.
    pub async fn login(&self, username: &str, password_input: &str) -> StrataResult<TokenPair> {
        // 1. Look up the user; absence is indistinguishable from a
        //    bad password.
        let user = match self.user_repo.get_by_username(username).await {
            Ok(u) => u,
            Err(e) if e.is_not_found() => return Err(AuthError::InvalidCredentials.into()),
            Err(e) => return Err(e),
        };

        // 2. Verify the password.
        let valid = password::verify_password(password_input, &user.password_hash)
            .map_err(StrataError::from)?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Enabled check.
        if !user.enabled {
            return Err(AuthError::AccountDisabled.into());
        }

        // 4. Issue the pair (rotates any prior refresh token).
        self.issue_pair(&user).await
    }

    /// Rotate a refresh token: validate it, then issue a new pair.
    /// The old token is revoked as part of issuance.
    pub async fn refresh(&self, raw: &str) -> StrataResult<TokenPair> {
        if !self.validate_refresh_token(raw).await {
            return Err(AuthError::TokenInvalid("refresh token rejected".into()).into());
        }

        // The embedded subject is trustworthy once validated above.
        let claims = token::decode_refresh_token(raw, &self.config).map_err(StrataError::from)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))
            .map_err(StrataError::from)?;

        let user = self.user_repo.get_by_id(user_id).await?;
        if !user.enabled {
            return Err(AuthError::AccountDisabled.into());
        }

        self.issue_pair(&user).await
    }

    /// Revoke the presented refresh token (logout).
    pub async fn logout(&self, raw: &str) -> StrataResult<()> {
        self.revoke(raw).await
    }

    async fn issue_pair(&self, user: &User) -> StrataResult<TokenPair> {
        // The tenant name claim is a convenience for clients; a lookup
        // failure degrades to an id-only token rather than blocking
        // issuance.
        let tenant_name = match self.tenant_repo.get_by_id(user.tenant_id).await {
            Ok(tenant) => Some(tenant.name),
            Err(e) => {
                debug!(error = %e, tenant_id = %user.tenant_id, "tenant name unavailable");
                None
            }
        };

        let refresh_token = self.issue_refresh_token(user).await?;
        let access_token = self.issue_access_token(user, tenant_name)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_ttl_secs,
        })
    }
}
