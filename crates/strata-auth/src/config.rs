//! Authentication configuration.

use crate::error::AuthError;

/// Minimum signing-secret length for HS256 (256-bit margin).
pub const MIN_SECRET_BYTES: usize = 32;

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Symmetric HS256 signing secret. Must be at least
    /// [`MIN_SECRET_BYTES`] bytes; an undersized secret is a startup
    /// failure, never silently replaced with an ephemeral key (that
    /// would invalidate every token on each restart).
    pub secret: String,
    /// JWT issuer (`iss` claim).
    pub issuer: String,
    /// Access token lifetime in seconds (default: 1800 = 30 minutes).
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 604800 = 7 days).
    pub refresh_token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "strata".into(),
            access_token_ttl_secs: 1800,
            refresh_token_ttl_secs: 604_800,
        }
    }
}

impl AuthConfig {
    /// Reject configurations that cannot provide the required
    /// security margin. Called once at startup; a failure is fatal.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::WeakSecret(self.secret.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undersized_secret_is_a_configuration_defect() {
        let config = AuthConfig {
            secret: "short".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AuthError::WeakSecret(5))));
    }

    #[test]
    fn sufficient_secret_passes() {
        let config = AuthConfig {
            secret: "0123456789abcdef0123456789abcdef".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
