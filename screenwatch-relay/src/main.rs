use anyhow::{Context, Result};
use clap::Parser;
use screenwatch_relay::{RelayHub, router};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "screenwatch-relay", about = "Room-scoped signaling relay for screen observation")]
struct Args {
    /// Address the websocket endpoint listens on.
    #[arg(long, env = "SCREENWATCH_RELAY_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let app = router(RelayHub::new());
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;

    info!("Relay listening on ws://{}/ws", args.bind);
    axum::serve(listener, app).await.context("relay server stopped")?;
    Ok(())
}
