use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

// Where a report sits in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportStatus {
    Created,
    Requested,
    Received,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Created => "created",
            ReportStatus::Requested => "requested",
            ReportStatus::Received => "received",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// A single report moving through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    pub id: u64,
    pub status: ReportStatus,
    pub request_time: Option<DateTime<Utc>>, // set once the create call succeeds
    pub last_request_time: Option<Instant>,  // None = never polled
    pub value: String,
}

impl ReportRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            status: ReportStatus::Created,
            request_time: None,
            last_request_time: None,
            value: String::new(),
        }
    }

    // Line written to the output file: "<request_time>;<value>"
    pub fn to_line(&self) -> String {
        let time = self
            .request_time
            .map(|t| format!("{}.{:06}", t.timestamp(), t.timestamp_subsec_micros()))
            .unwrap_or_default();
        format!("{};{}\n", time, self.value)
    }
}

/// Hands out report ids. Ids start at 1 and are never reused.
#[derive(Debug)]
pub struct RecordIds {
    next: AtomicU64,
}

impl RecordIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_record(&self) -> ReportRecord {
        ReportRecord::new(self.next_id())
    }
}

impl Default for RecordIds {
    fn default() -> Self {
        Self::new()
    }
}

// POST /reports body
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateReportRequest {
    pub id: String,
}

// GET /reports/{id} body
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ReportResponse {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: u64,
    pub value: String,
}

// The API echoes ids back either as numbers or as strings
fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireId {
        Number(u64),
        Text(String),
    }

    match WireId::deserialize(deserializer)? {
        WireId::Number(n) => Ok(n),
        WireId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
