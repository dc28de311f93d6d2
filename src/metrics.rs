use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, GaugeVec, Histogram, register_counter, register_counter_vec,
    register_gauge_vec, register_histogram,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: CounterVec = register_counter_vec!(
        "reports_requests_total",
        "Outbound API requests by worker",
        &["worker"]
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: CounterVec = register_counter_vec!(
        "reports_rate_limited_total",
        "Attempts deferred by the rate gate",
        &["worker"]
    )
    .unwrap();
    pub static ref REPORTS_CREATED: Counter =
        register_counter!("reports_created_total", "Reports accepted by the API").unwrap();
    pub static ref REPORTS_RECEIVED: Counter =
        register_counter!("reports_received_total", "Reports with results fetched").unwrap();
    pub static ref REPORTS_DROPPED: Counter =
        register_counter!("reports_dropped_total", "Reports lost after a failed create").unwrap();
    pub static ref REPORTS_WRITTEN: Counter =
        register_counter!("reports_written_total", "Result lines appended to the output").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "reports_request_latency_seconds",
        "API request latency in seconds"
    )
    .unwrap();
    pub static ref QUEUE_DEPTH: GaugeVec = register_gauge_vec!(
        "reports_queue_depth",
        "Reports waiting in each status queue",
        &["status"]
    )
    .unwrap();
}
