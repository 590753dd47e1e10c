/**
 * FLEET KERNEL - Entry point
 *
 * Loads the fleet topology, builds the immutable node registry and serves the
 * health / relay API. No background loops: every probe is client-initiated.
 */

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleet_kernel::{build_router, load_config, AppState, HttpTransport, NodeRegistry, SshShell};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleet_kernel=info")),
        )
        .init();

    let cfg = load_config().await;
    let registry = Arc::new(NodeRegistry::from_config(&cfg).context("invalid node registry")?);
    for node in registry.nodes() {
        info!(
            "node {} -> {} ({})",
            node.id,
            node.endpoint,
            node.remote_target.as_deref().unwrap_or("local")
        );
    }

    let http = HttpTransport::new().context("failed to create HTTP transport")?;
    let shell = Arc::new(SshShell::from_config(&cfg.shell).context("invalid shell command")?);
    let app = build_router(AppState::new(registry, http, shell, &cfg.timeouts));

    let addr: SocketAddr = cfg
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {:?}", cfg.listen))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
