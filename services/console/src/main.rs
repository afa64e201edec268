//! Gateway console
//!
//! Single-binary client runtime for the gateway's operational console:
//! 1. Loads configuration and logs in with the console password
//! 2. Subscribes to the log and notification push channels
//! 3. Maintains the account-pool cache and periodic refresh timers
//! 4. Tears everything down on logout, ctrl-c, or session expiry

mod config;
mod error;
mod session;

use anyhow::{Context, Result};
use gateway_client::GatewayClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting gateway-console");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.gateway.base_url,
        refresh_secs = config.timers.refresh_secs,
        "configuration loaded"
    );

    let client = GatewayClient::new(reqwest::Client::new(), config.gateway.base_url.clone());

    let password = config
        .gateway
        .password
        .as_deref()
        .context("no password configured — set CONSOLE_PASSWORD or password_file")?;
    client.login(password).await.context("login failed")?;

    let status = client.auth_status().await.context("auth-status check failed")?;
    anyhow::ensure!(status.authenticated, "gateway did not confirm authentication");
    info!("authenticated");

    let mut session = Session::start(client.clone(), &config);
    if let Err(e) = session.seed().await {
        // Expiry already raised the end signal; anything else is retried by
        // the periodic refresh
        warn!(error = %e, "initial data load failed");
    }

    tokio::select! {
        _ = session.run_until_end() => {
            warn!("session ended");
        }
        _ = shutdown_signal() => {
            if let Err(e) = client.logout().await {
                warn!(error = %e, "logout failed");
            }
        }
    }

    session.teardown();
    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
