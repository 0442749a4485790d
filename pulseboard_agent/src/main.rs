//! pulseboard agent entry point: parse config, install logging, serve.

use std::net::SocketAddr;

use anyhow::Context;
use pulseboard_agent::config::{AgentConfig, Command, USAGE};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "pulseboard_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AgentConfig::from_args(std::env::args()).context("invalid configuration")? {
        Command::Help => {
            println!("{USAGE}");
            return Ok(());
        }
        Command::Run(config) => *config,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        seed = config.seed,
        thresholds = config.thresholds.len(),
        "pulseboard agent running at http://{}",
        listener.local_addr()?
    );

    pulseboard_agent::serve(listener, config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
