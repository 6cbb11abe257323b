use anyhow::{Context, Result};
use catalog_relay_http::config::RelayConfig;
use catalog_relay_http::server::RelayServer;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = RelayConfig::from_env().context("Failed to load configuration")?;

    init_tracing(&config.log_level);

    info!("catalog-relay service starting");
    info!(
        "Configuration loaded: catalog={}, local_api={}, port={}",
        config.catalog_api_url, config.local_api_url, config.port
    );

    if config.bot_token.is_none() {
        warn!(
            insecure_mode = config.insecure_skip_verification,
            "BOT_TOKEN not configured"
        );
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }

    let server = RelayServer::new(config).context("Failed to create relay server")?;

    if let Err(e) = server.run_until(shutdown_signal()).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("catalog-relay service stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
