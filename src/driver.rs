use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ReportsApi;
use crate::creator::Creator;
use crate::error::{PipelineError, Result};
use crate::models::RecordIds;
use crate::poller::Poller;
use crate::queues::StatusQueues;
use crate::rate_limit::RateGate;
use crate::sink::Sink;
use crate::worker::{RateGuard, RequestWorker};

// Pacing of the two request loops
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub create_interval: Duration,
    pub poll_interval: Duration,
}

// How one pipeline task ended
#[derive(Debug)]
pub struct TaskExit {
    pub task: &'static str,
    pub result: Result<()>,
}

/// Owns the state shared by the pipeline loops and runs them.
///
/// Creator, Poller and Sink share one rate gate, one id sequence and one
/// set of status queues. A loop that fails is logged and the others keep
/// going until `cancel` fires.
pub struct Driver {
    api: Arc<dyn ReportsApi>,
    gate: Arc<RateGate>,
    ids: Arc<RecordIds>,
    queues: Arc<StatusQueues>,
}

impl Driver {
    pub fn new(api: Arc<dyn ReportsApi>, gate: Arc<RateGate>) -> Self {
        Self {
            api,
            gate,
            ids: Arc::new(RecordIds::new()),
            queues: Arc::new(StatusQueues::new()),
        }
    }

    pub fn queues(&self) -> &Arc<StatusQueues> {
        &self.queues
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }

    pub async fn run<W>(
        &self,
        settings: PipelineSettings,
        output: W,
        cancel: CancellationToken,
    ) -> Vec<TaskExit>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let creator = Creator::new(
            self.api.clone(),
            self.queues.clone(),
            self.ids.clone(),
            RateGuard::new(self.gate.clone(), "creator"),
            settings.create_interval,
        );
        let poller = Poller::new(
            self.api.clone(),
            self.queues.clone(),
            RateGuard::new(self.gate.clone(), "poller"),
            settings.poll_interval,
        );
        let mut sink = Sink::new(self.queues.clone(), output);

        let tasks: Vec<(&'static str, JoinHandle<Result<()>>)> = vec![
            (creator.name(), spawn_worker(creator, cancel.clone())),
            (poller.name(), spawn_worker(poller, cancel.clone())),
            ("sink", {
                let cancel = cancel.clone();
                tokio::spawn(async move { sink.run(cancel).await })
            }),
        ];
        info!("Pipeline running with {} tasks", tasks.len());

        let mut exits = Vec::with_capacity(tasks.len());
        for (task, handle) in tasks {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(PipelineError::TaskPanicked(e.to_string())),
            };
            if let Err(e) = &result {
                error!("[{}] ended with error: {}", task, e);
            }
            exits.push(TaskExit { task, result });
        }
        exits
    }
}

fn spawn_worker<W>(worker: W, cancel: CancellationToken) -> JoinHandle<Result<()>>
where
    W: RequestWorker + 'static,
{
    tokio::spawn(async move { worker.run(cancel).await })
}
