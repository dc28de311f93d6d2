mod health;
mod metrics;

pub use health::health_handler;
pub use metrics::metrics_handler;

use axum::{Router, routing::get};
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use crate::state::AppState;

// status routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// Serves the status routes until cancelled
pub async fn serve(port: u16, state: Arc<AppState>, cancel: CancellationToken) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Status server running on http://localhost:{}", port);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
