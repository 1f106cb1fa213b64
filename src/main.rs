use std::sync::Arc;

use anyhow::{Context, Result};
use inkstream::client::LLMClient;
use inkstream::config::RelayConfig;
use inkstream::http::reqwest::dyn_transport;
use inkstream::relay;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let config = RelayConfig::from_env().context("failed to read configuration")?;
    let transport =
        dyn_transport(config.proxy.as_deref()).context("failed to build HTTP transport")?;
    let client = Arc::new(LLMClient::from_relay_config(&config, transport));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        provider = %config.llm.provider,
        model = %config.llm.model,
        proxy = config.proxy.is_some(),
        "relay listening on {}",
        relay::STREAM_PATH
    );

    axum::serve(listener, relay::router(client))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("relay server failed")?;
    Ok(())
}
