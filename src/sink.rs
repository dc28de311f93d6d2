use log::{debug, info};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::metrics::REPORTS_WRITTEN;
use crate::models::{ReportRecord, ReportStatus};
use crate::queues::StatusQueues;

// Appends received reports to the output, one line per report
pub struct Sink<W> {
    queues: Arc<StatusQueues>,
    writer: W,
}

impl<W> Sink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(queues: Arc<StatusQueues>, writer: W) -> Self {
        Self { queues, writer }
    }

    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!("[sink] started");
        while let Some(record) = self.queues.next(ReportStatus::Received, &cancel).await {
            self.write(&record).await?;
        }

        // whatever already arrived still goes to disk
        let drained = self.drain().await?;
        info!("[sink] stopped, flushed {} pending report(s)", drained);
        Ok(())
    }

    // Writes every record currently waiting, returns how many
    pub async fn drain(&mut self) -> Result<usize> {
        let mut written = 0;
        while let Some(record) = self.queues.pop_front(ReportStatus::Received) {
            self.write(&record).await?;
            written += 1;
        }
        Ok(written)
    }

    async fn write(&mut self, record: &ReportRecord) -> Result<()> {
        self.writer.write_all(record.to_line().as_bytes()).await?;
        self.writer.flush().await?;
        REPORTS_WRITTEN.inc();
        debug!("[sink] report {} written", record.id);
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
