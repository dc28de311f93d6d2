use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;
use crate::models::ReportStatus;
use crate::rate_limit::Timeline;
use crate::state::AppState;

// health handler, reports queue depths and the current rate windows
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let limits = state.gate.limits();
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "started_at": state.started_at.to_rfc3339(),
        "queues": {
            "requested": state.queues.len(ReportStatus::Requested),
            "received": state.queues.len(ReportStatus::Received),
        },
        "rate_limit": {
            "per_second": limits.per_second,
            "per_minute": limits.per_minute,
            "second_window_count": state.gate.count(Timeline::Second),
            "minute_window_count": state.gate.count(Timeline::Minute),
        }
    }))
}
