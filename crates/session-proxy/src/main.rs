use anyhow::Context;
use clap::Parser;

use meetai_call_core::logging::{parse_log_level, setup_logging, LoggingConfig};
use meetai_session_proxy::{router, AppState, ProxyConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ProxyConfig::parse();

    let level = parse_log_level(&config.log_level)?;
    let mut logging = LoggingConfig::new(level, "meetai-proxy");
    if config.json_logs {
        logging = logging.with_json();
    }
    setup_logging(logging)?;

    if config.api_key().is_none() {
        tracing::warn!("OPENAI_API_KEY is not set, session requests will fail");
    }

    let addr = config.listen_addr()?;
    let app = router(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "session proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("session proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
