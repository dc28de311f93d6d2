use async_trait::async_trait;
use log::debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::metrics::{RATE_LIMITED_TOTAL, REQUEST_TOTAL};
use crate::rate_limit::{Admission, RateGate};

/// Shape shared by every loop that talks to the reports API.
///
/// `run` is the scheduling loop and returns only when `cancel` fires or a
/// fatal error ends the loop. `perform_request` is one outbound call and must
/// only be reached through a [`RateGuard`], see `guarded_request`.
#[async_trait]
pub trait RequestWorker: Send + Sync {
    type Target: Send;

    fn name(&self) -> &'static str;

    fn guard(&self) -> &RateGuard;

    async fn perform_request(&self, target: Self::Target) -> Result<()>;

    async fn run(&self, cancel: CancellationToken) -> Result<()>;

    async fn guarded_request(
        &self,
        target: Self::Target,
        cancel: &CancellationToken,
    ) -> Guarded<Self::Target, Result<()>> {
        self.guard()
            .call(target, cancel, |t| self.perform_request(t))
            .await
    }
}

// Outcome of a guarded call
#[derive(Debug)]
pub enum Guarded<T, R> {
    Performed(R),
    // gate said no; the caller already waited and gets the target back
    Deferred(T),
}

// Rate-limit decorator wrapped around every outbound request
#[derive(Debug, Clone)]
pub struct RateGuard {
    gate: Arc<RateGate>,
    worker: &'static str,
}

impl RateGuard {
    pub fn new(gate: Arc<RateGate>, worker: &'static str) -> Self {
        Self { gate, worker }
    }

    pub async fn call<T, R, F, Fut>(
        &self,
        target: T,
        cancel: &CancellationToken,
        op: F,
    ) -> Guarded<T, R>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = R>,
    {
        match self.gate.attempt() {
            Admission::Allowed => {
                REQUEST_TOTAL.with_label_values(&[self.worker]).inc();
                Guarded::Performed(op(target).await)
            }
            Admission::Rejected { timeline, wait } => {
                RATE_LIMITED_TOTAL.with_label_values(&[self.worker]).inc();
                debug!(
                    "[{}] {:?} limit reached, backing off {:?}",
                    self.worker, timeline, wait
                );
                sleep_or_cancel(wait, cancel).await;
                Guarded::Deferred(target)
            }
        }
    }
}

// Sleeps unless cancelled first. Returns false when cancelled.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimits;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn guard(per_second: u32) -> RateGuard {
        let gate = Arc::new(RateGate::new(RateLimits {
            per_second,
            per_minute: 0,
        }));
        RateGuard::new(gate, "test")
    }

    #[tokio::test(start_paused = true)]
    async fn test_allowed_call_runs_operation() {
        let guard = guard(1);
        let cancel = CancellationToken::new();

        let outcome = guard.call(7u64, &cancel, |id| async move { id * 2 }).await;
        assert!(matches!(outcome, Guarded::Performed(14)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_call_sleeps_and_returns_target() {
        let guard = guard(1);
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let op = move |_: u64| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        };

        assert!(matches!(guard.call(1, &cancel, op).await, Guarded::Performed(())));

        let started = Instant::now();
        match guard.call(2, &cancel, op).await {
            Guarded::Deferred(target) => assert_eq!(target, 2),
            Guarded::Performed(_) => panic!("second call should be deferred"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() >= Duration::from_secs(1));

        // the wait covered the rest of the window
        assert!(matches!(guard.call(3, &cancel, op).await, Guarded::Performed(())));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_cuts_backoff_short() {
        let guard = guard(1);
        let cancel = CancellationToken::new();
        guard.call((), &cancel, |_| async {}).await;

        cancel.cancel();
        let started = Instant::now();
        let outcome = guard.call((), &cancel, |_| async {}).await;
        assert!(matches!(outcome, Guarded::Deferred(())));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_cancel() {
        let cancel = CancellationToken::new();
        assert!(sleep_or_cancel(Duration::from_millis(50), &cancel).await);
        cancel.cancel();
        assert!(!sleep_or_cancel(Duration::from_secs(60), &cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guards_share_one_gate() {
        let gate = Arc::new(RateGate::new(RateLimits {
            per_second: 2,
            per_minute: 0,
        }));
        let creator = RateGuard::new(gate.clone(), "creator");
        let poller = RateGuard::new(gate.clone(), "poller");
        let cancel = CancellationToken::new();

        assert!(matches!(creator.call((), &cancel, |_| async {}).await, Guarded::Performed(())));
        assert!(matches!(poller.call((), &cancel, |_| async {}).await, Guarded::Performed(())));
        // the budget is spent across both workers
        assert!(matches!(poller.call((), &cancel, |_| async {}).await, Guarded::Deferred(())));
    }
}
