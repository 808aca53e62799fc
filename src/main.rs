use std::sync::Arc;

use clap::Parser;
use rmcp::ServiceExt;

use tfc_mcp::{
    config::{Args, ServerConfig, TransportKind},
    server, SessionStore, TfcClient, TfcMcpBridge, TokenResolver,
};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

async fn serve_http(config: &ServerConfig, bridge: TfcMcpBridge, store: Arc<SessionStore>) -> anyhow::Result<()> {
    let app = server::router(bridge, store);
    let addr = config.bind_addr().await?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Terraform Cloud MCP server listening on http://{}/mcp", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn serve_stdio(bridge: TfcMcpBridge) -> anyhow::Result<()> {
    tracing::info!("Terraform Cloud MCP server running on stdio");

    let service = bridge.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (silently ignore if not found)
    dotenvy::dotenv().ok();

    // stdout belongs to the stdio transport, so logs go to stderr
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("tfc_mcp=info,rmcp=info,tower_http=info")
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config()?;

    let store = Arc::new(SessionStore::new(config.store.clone()));
    let _sweeper = store.spawn_sweeper(config.sweep_interval);

    let resolver = TokenResolver::new(store.clone(), config.default_token.clone());
    let api = TfcClient::new(&config.tfc_address)?;

    tracing::info!("Starting Terraform Cloud MCP server");
    tracing::info!("  Transport: {:?}", config.transport);
    tracing::info!("  Terraform Cloud: {}", api.base_url());
    tracing::info!("  Default token configured: {}", resolver.has_default());
    tracing::info!(
        "  Session idle TTL: {}s, max sessions: {}",
        config.store.idle_ttl.as_secs(),
        config.store.max_entries
    );

    let bridge = TfcMcpBridge::new(resolver, api);

    match config.transport {
        TransportKind::Http => serve_http(&config, bridge, store).await,
        TransportKind::Stdio => serve_stdio(bridge).await,
    }
}
