use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::{ReportsApi, Success};
use crate::error::{ApiError, PipelineError, Result};
use crate::worker::{Guarded, RateGuard, RequestWorker};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeSummary {
    pub deleted: u64,
    pub failed: u64,
}

/// Deletes a batch of reports with sequential ids.
///
/// Maintenance counterpart to the pipeline: `count` ids starting at
/// `start_id`, each call going through the shared rate gate.
pub struct Purger {
    api: Arc<dyn ReportsApi>,
    guard: RateGuard,
    start_id: u64,
    count: u64,
}

impl Purger {
    pub fn new(api: Arc<dyn ReportsApi>, guard: RateGuard, start_id: u64, count: u64) -> Self {
        Self {
            api,
            guard,
            start_id,
            count,
        }
    }

    pub async fn purge(&self, cancel: &CancellationToken) -> PurgeSummary {
        let mut summary = PurgeSummary::default();
        let end = self.start_id.saturating_add(self.count);

        for id in self.start_id..end {
            // ids the gate turns away are retried once the wait is over
            let mut target = id;
            let result = loop {
                if cancel.is_cancelled() {
                    return summary;
                }
                match self.guarded_request(target, cancel).await {
                    Guarded::Performed(result) => break result,
                    Guarded::Deferred(id) => target = id,
                }
            };

            match result {
                Ok(()) => summary.deleted += 1,
                Err(e) => {
                    warn!("[purge] report {} not deleted: {}", id, e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

#[async_trait]
impl RequestWorker for Purger {
    type Target = u64;

    fn name(&self) -> &'static str {
        "purge"
    }

    fn guard(&self) -> &RateGuard {
        &self.guard
    }

    async fn perform_request(&self, id: u64) -> Result<()> {
        match self.api.delete(id).await? {
            Success::NoContent => {
                info!("[purge] deleted report {}", id);
                Ok(())
            }
            other => Err(ApiError::UnmappedStatus(other.code()).into()),
        }
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!(
            "[purge] deleting {} report(s) starting at id {}",
            self.count, self.start_id
        );
        let summary = self.purge(&cancel).await;
        info!(
            "[purge] done: {} deleted, {} failed",
            summary.deleted, summary.failed
        );
        if summary.deleted == 0 && summary.failed > 0 {
            return Err(PipelineError::NothingDeleted {
                failed: summary.failed,
            });
        }
        Ok(())
    }
}
