//! Demo entry point: wires the gateway up against real stores and runs
//! the background persistence worker. Serving `Gateway::handle_payload`
//! over a concrete transport (HTTP, a game server's own RPC framing,
//! whatever a deployment already uses) is left to that deployment.

use tracing_subscriber::EnvFilter;
use worldgate::{config, Gateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = config::load_config();
    let gateway = Gateway::connect(config).await?;

    let worker = gateway.worker.clone();
    tokio::spawn(async move { worker.run().await });

    tracing::info!("worldgate gateway ready; background persistence worker running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    Ok(())
}
