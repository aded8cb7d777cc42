//! STRATA Server — application entry point.

use tracing_subscriber::EnvFilter;

use strata_core::error::{StrataError, StrataResult};
use strata_server::config::ServerConfig;
use strata_server::routes;
use strata_server::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("strata=info".parse().unwrap()),
        )
        .json()
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "fatal startup error");
        std::process::exit(1);
    }
}

async fn run() -> StrataResult<()> {
    let config = ServerConfig::from_env()?;
    config.auth.validate().map_err(StrataError::from)?;

    let pool = strata_db::connect(&config.db)
        .await
        .map_err(StrataError::from)?;

    let state = AppState::new(pool, &config);

    // Shared-schema failures abort startup; individual tenant failures
    // are logged inside bootstrap and retried on the next run.
    state.provisioner.bootstrap(&state.tenants).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| StrataError::Configuration {
            message: format!("binding {}: {e}", config.bind_addr),
        })?;
    tracing::info!(addr = %config.bind_addr, "STRATA server listening");

    axum::serve(listener, routes::router(state))
        .await
        .map_err(|e| StrataError::Internal(e.to_string()))
}
