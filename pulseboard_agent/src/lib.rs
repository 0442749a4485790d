//! pulseboard agent: simulated telemetry, threshold alerts and synthetic logs,
//! streamed to dashboard clients over WebSocket.

pub mod alerts;
pub mod config;
pub mod error;
pub mod hub;
pub mod logs;
pub mod metrics;
pub mod pipeline;
pub mod scheduler;
pub mod state;
pub mod types;
pub mod ws;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::AgentConfig;
use crate::hub::Hub;
use crate::pipeline::Pipeline;
use crate::scheduler::BroadcastScheduler;
use crate::state::AppState;

pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);
    match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

/// Run the agent on `listener` until `shutdown` resolves, then stop both
/// timers and close every client socket.
pub async fn serve<F>(listener: TcpListener, config: AgentConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let hub = Arc::new(Hub::new());
    let pipeline = Arc::new(Pipeline::new(config.thresholds.clone(), config.seed));
    let scheduler =
        BroadcastScheduler::start(pipeline.clone(), hub.clone(), config.scheduler, config.seed);

    let app = router(
        AppState {
            pipeline,
            hub: hub.clone(),
        },
        config.static_dir.as_deref(),
    );

    let closer = hub.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("shutdown requested");
            closer.close_all();
        })
        .await;

    scheduler.stop().await;
    hub.close_all();
    result.context("server error")
}
