use dashmap::DashMap;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::metrics::QUEUE_DEPTH;
use crate::models::{ReportRecord, ReportStatus};

/// Hand-off point between the pipeline loops.
///
/// One FIFO queue per status. Records are owned by value, so a record can
/// only ever sit in one queue. Pushing wakes one consumer waiting on that
/// status.
#[derive(Debug, Default)]
pub struct StatusQueues {
    queues: DashMap<ReportStatus, VecDeque<ReportRecord>>,
    requested_ready: Notify,
    received_ready: Notify,
    created_ready: Notify,
}

impl StatusQueues {
    pub fn new() -> Self {
        Self::default()
    }

    // Append to the queue matching the record's status
    pub fn push_back(&self, record: ReportRecord) {
        let status = record.status;
        let depth = {
            let mut queue = self.queues.entry(status).or_default();
            queue.push_back(record);
            queue.len()
        };
        self.after_push(status, depth);
    }

    // Put a record back at the head, keeping its place in line
    pub fn push_front(&self, record: ReportRecord) {
        let status = record.status;
        let depth = {
            let mut queue = self.queues.entry(status).or_default();
            queue.push_front(record);
            queue.len()
        };
        self.after_push(status, depth);
    }

    pub fn pop_front(&self, status: ReportStatus) -> Option<ReportRecord> {
        let mut queue = self.queues.get_mut(&status)?;
        let record = queue.pop_front();
        QUEUE_DEPTH
            .with_label_values(&[status.as_str()])
            .set(queue.len() as f64);
        record
    }

    /// Waits for the next record with `status`.
    ///
    /// Returns `None` once `cancel` fires.
    pub async fn next(
        &self,
        status: ReportStatus,
        cancel: &CancellationToken,
    ) -> Option<ReportRecord> {
        loop {
            if let Some(record) = self.pop_front(status) {
                return Some(record);
            }
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = self.ready(status).notified() => {}
            }
        }
    }

    pub fn len(&self, status: ReportStatus) -> usize {
        self.queues.get(&status).map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, status: ReportStatus) -> bool {
        self.len(status) == 0
    }

    // Ids currently queued under a status, front first
    pub fn ids(&self, status: ReportStatus) -> Vec<u64> {
        self.queues
            .get(&status)
            .map(|q| q.iter().map(|r| r.id).collect())
            .unwrap_or_default()
    }

    fn ready(&self, status: ReportStatus) -> &Notify {
        match status {
            ReportStatus::Requested => &self.requested_ready,
            ReportStatus::Received => &self.received_ready,
            ReportStatus::Created => &self.created_ready,
        }
    }

    fn after_push(&self, status: ReportStatus, depth: usize) {
        QUEUE_DEPTH
            .with_label_values(&[status.as_str()])
            .set(depth as f64);
        // stores a permit when nobody is waiting yet
        self.ready(status).notify_one();
    }
}
