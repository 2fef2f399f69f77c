use std::sync::Arc;

use anyhow::{Context, Result};
use relay_engine::{Relay, ReqwestUpstream};
use relay_logging::{relay_info, relay_warn};
use relay_server::{build_router, serve, RelayConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real deployments set the environment directly.
    let dotenv = dotenvy::dotenv();

    let config = RelayConfig::from_env().context("invalid relay configuration")?;
    relay_logging::initialize(config.log_destination, config.log_level, "relay.log");
    if let Err(err) = dotenv {
        relay_warn!("No .env file loaded: {}", err);
    }

    let upstream =
        ReqwestUpstream::new(config.upstream.clone()).context("failed to build HTTP client")?;
    let relay = Arc::new(Relay::new(Arc::new(upstream), config.routes()));
    let router = build_router(relay, config.max_upload_bytes);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    relay_info!("Relay server running on {}", addr);
    relay_info!("Health check: http://{}/health", addr);
    relay_info!(
        "Workflow webhooks: default={} setupWithKeywords={}",
        config.webhook_default,
        config.webhook_setup_with_keywords
    );

    serve(listener, router, shutdown_signal())
        .await
        .context("server error")?;
    relay_info!("Relay server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        relay_warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
