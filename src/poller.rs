use async_trait::async_trait;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::ReportsApi;
use crate::error::{PipelineError, Result};
use crate::metrics::REPORTS_RECEIVED;
use crate::models::{ReportRecord, ReportStatus};
use crate::queues::StatusQueues;
use crate::worker::{Guarded, RateGuard, RequestWorker, sleep_or_cancel};

/// Polls requested reports until the service hands back their value.
///
/// A record is polled at most once per `interval`. Anything short of a
/// matching result puts the record back on the requested queue.
pub struct Poller {
    api: Arc<dyn ReportsApi>,
    queues: Arc<StatusQueues>,
    guard: RateGuard,
    interval: Duration,
}

// Never polled, or last polled more than `interval` ago
pub fn is_eligible(record: &ReportRecord, now: Instant, interval: Duration) -> bool {
    match record.last_request_time {
        None => true,
        Some(last) => now.saturating_duration_since(last) > interval,
    }
}

impl Poller {
    pub fn new(
        api: Arc<dyn ReportsApi>,
        queues: Arc<StatusQueues>,
        guard: RateGuard,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            queues,
            guard,
            interval,
        }
    }
}

#[async_trait]
impl RequestWorker for Poller {
    type Target = ReportRecord;

    fn name(&self) -> &'static str {
        "poller"
    }

    fn guard(&self) -> &RateGuard {
        &self.guard
    }

    async fn perform_request(&self, mut record: ReportRecord) -> Result<()> {
        let fetched = self.api.fetch(record.id).await;
        record.last_request_time = Some(Instant::now());

        match fetched {
            Ok(Some(body)) => {
                if body.id != record.id {
                    return Err(PipelineError::IdMismatch {
                        expected: record.id,
                        received: body.id,
                    });
                }
                record.value = body.value;
                record.status = ReportStatus::Received;
                info!("[poller] report {} received", record.id);
                self.queues.push_back(record);
                REPORTS_RECEIVED.inc();
            }
            Ok(None) => {
                debug!("[poller] report {} not ready yet", record.id);
                self.queues.push_back(record);
            }
            Err(e) => {
                debug!("[poller] report {} will be retried: {}", record.id, e);
                self.queues.push_back(record);
            }
        }
        Ok(())
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!("[poller] started, poll interval {:?}", self.interval);

        while let Some(record) = self.queues.next(ReportStatus::Requested, &cancel).await {
            if !is_eligible(&record, Instant::now(), self.interval) {
                self.queues.push_back(record);
                if !sleep_or_cancel(self.interval, &cancel).await {
                    break;
                }
                continue;
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.guarded_request(record, &cancel) => outcome,
            };

            match outcome {
                Guarded::Deferred(record) => self.queues.push_front(record),
                Guarded::Performed(Ok(())) => {}
                Guarded::Performed(Err(e)) => {
                    error!("[poller] stopping: {}", e);
                    return Err(e);
                }
            }
        }

        info!("[poller] stopped");
        Ok(())
    }
}
