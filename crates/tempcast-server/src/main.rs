//! tempcast server binary - CLI parsing, tracing setup, and the axum serve
//! loop. All per-connection logic lives in `tempcast-core`; this crate only
//! hosts it behind an HTTP listener.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tempcast_core::ConnectionRegistry;

mod page;
mod ws;

/// WebSocket push server streaming synthetic temperature readings
#[derive(Debug, Parser)]
#[command(name = "tempcast", version)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let registry = Arc::new(ConnectionRegistry::new());

    let app = Router::new()
        .route("/", get(page::index))
        .route("/ws", get(ws::ws_handler))
        .with_state(registry);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "tempcast listening");
    axum::serve(listener, app).await?;

    Ok(())
}
