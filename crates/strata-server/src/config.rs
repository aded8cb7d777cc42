//! Environment-driven server configuration.

use std::str::FromStr;

use strata_auth::config::AuthConfig;
use strata_core::error::{StrataError, StrataResult};
use strata_db::DbConfig;

/// Everything the server needs to start, read once from the
/// environment. Secret strength is checked separately at startup via
/// [`AuthConfig::validate`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
    /// Base domain under which tenant subdomains live.
    pub base_domain: String,
    pub db: DbConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> StrataResult<Self> {
        let db_defaults = DbConfig::default();
        let auth_defaults = AuthConfig::default();

        Ok(Self {
            bind_addr: env_or("STRATA_BIND_ADDR", "0.0.0.0:8080"),
            base_domain: env_or("STRATA_BASE_DOMAIN", "localhost"),
            db: DbConfig {
                url: env_required("DATABASE_URL")?,
                max_connections: env_parsed(
                    "STRATA_DB_MAX_CONNECTIONS",
                    db_defaults.max_connections,
                )?,
                acquire_timeout_secs: env_parsed(
                    "STRATA_DB_ACQUIRE_TIMEOUT_SECS",
                    db_defaults.acquire_timeout_secs,
                )?,
                statement_timeout_secs: env_parsed(
                    "STRATA_DB_STATEMENT_TIMEOUT_SECS",
                    db_defaults.statement_timeout_secs,
                )?,
            },
            auth: AuthConfig {
                secret: env_required("STRATA_AUTH_SECRET")?,
                issuer: env_or("STRATA_AUTH_ISSUER", &auth_defaults.issuer),
                access_token_ttl_secs: env_parsed(
                    "STRATA_ACCESS_TOKEN_TTL_SECS",
                    auth_defaults.access_token_ttl_secs,
                )?,
                refresh_token_ttl_secs: env_parsed(
                    "STRATA_REFRESH_TOKEN_TTL_SECS",
                    auth_defaults.refresh_token_ttl_secs,
                )?,
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_required(key: &str) -> StrataResult<String> {
    std::env::var(key).map_err(|_| StrataError::Configuration {
        message: format!("{key} must be set"),
    })
}

fn env_parsed<T>(key: &str, default: T) -> StrataResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e| StrataError::Configuration {
            message: format!("{key}: {e}"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_values_reject_garbage() {
        // Env mutation is process-global; use a key no other test reads.
        unsafe { std::env::set_var("STRATA_TEST_PARSED", "not-a-number") };
        let parsed: StrataResult<u32> = env_parsed("STRATA_TEST_PARSED", 10);
        assert!(matches!(
            parsed,
            Err(StrataError::Configuration { .. })
        ));
        unsafe { std::env::remove_var("STRATA_TEST_PARSED") };
    }

    #[test]
    fn missing_optional_falls_back_to_default() {
        let parsed: StrataResult<u32> = env_parsed("STRATA_TEST_ABSENT", 7);
        assert_eq!(parsed.unwrap(), 7);
    }
}
