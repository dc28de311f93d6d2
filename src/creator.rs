use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api::{ReportsApi, Success};
use crate::error::{ApiError, Result};
use crate::metrics::{REPORTS_CREATED, REPORTS_DROPPED};
use crate::models::{RecordIds, ReportRecord, ReportStatus};
use crate::queues::StatusQueues;
use crate::worker::{Guarded, RateGuard, RequestWorker, sleep_or_cancel};

// Requests a new report every `interval`
pub struct Creator {
    api: Arc<dyn ReportsApi>,
    queues: Arc<StatusQueues>,
    ids: Arc<RecordIds>,
    guard: RateGuard,
    interval: Duration,
}

impl Creator {
    pub fn new(
        api: Arc<dyn ReportsApi>,
        queues: Arc<StatusQueues>,
        ids: Arc<RecordIds>,
        guard: RateGuard,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            queues,
            ids,
            guard,
            interval,
        }
    }
}

#[async_trait]
impl RequestWorker for Creator {
    type Target = ReportRecord;

    fn name(&self) -> &'static str {
        "creator"
    }

    fn guard(&self) -> &RateGuard {
        &self.guard
    }

    async fn perform_request(&self, mut record: ReportRecord) -> Result<()> {
        match self.api.create(record.id).await? {
            Success::Created => {
                record.request_time = Some(Utc::now());
                record.status = ReportStatus::Requested;
                info!("[creator] report {} requested", record.id);
                self.queues.push_back(record);
                REPORTS_CREATED.inc();
                Ok(())
            }
            other => Err(ApiError::UnmappedStatus(other.code()).into()),
        }
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!("[creator] started, one report every {:?}", self.interval);
        // a record the gate turned away is retried before minting a new id
        let mut pending: Option<ReportRecord> = None;

        while !cancel.is_cancelled() {
            let record = pending.take().unwrap_or_else(|| self.ids.next_record());
            let id = record.id;

            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.guarded_request(record, &cancel) => outcome,
            };

            match outcome {
                Guarded::Deferred(record) => {
                    pending = Some(record);
                    continue;
                }
                Guarded::Performed(Err(e)) => {
                    // no retry: a second create for the same id would only conflict
                    warn!("[creator] report {} dropped: {}", id, e);
                    REPORTS_DROPPED.inc();
                }
                Guarded::Performed(Ok(())) => {}
            }

            if !sleep_or_cancel(self.interval, &cancel).await {
                break;
            }
        }

        info!("[creator] stopped");
        Ok(())
    }
}
