use chrono::{DateTime, Utc};
use std::sync::Arc;
use crate::queues::StatusQueues;
use crate::rate_limit::RateGate;
// status server's shared state

pub struct AppState {
    pub queues: Arc<StatusQueues>, // live pipeline queues
    pub gate: Arc<RateGate>,       // shared request counters
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(queues: Arc<StatusQueues>, gate: Arc<RateGate>) -> Self {
        Self {
            queues,
            gate,
            started_at: Utc::now(),
        }
    }
}
