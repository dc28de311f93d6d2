use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

// Rolling windows the remote service counts requests in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeline {
    Second,
    Minute,
}

impl Timeline {
    pub fn window(self) -> Duration {
        match self {
            Timeline::Second => Duration::from_secs(1),
            Timeline::Minute => Duration::from_secs(60),
        }
    }
}

// Request ceilings, 0 disables a timeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimits {
    pub per_second: u32,
    pub per_minute: u32,
}

// Counter for one timeline
#[derive(Debug)]
pub struct RateLimitEntry {
    pub timeline: Timeline,
    pub limit: u32,
    pub count: u32,
    pub window_start: Instant,
}

// What the gate decided for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected { timeline: Timeline, wait: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

// Pending change to an entry, applied only if every timeline allows
enum Step {
    Skip,
    Increment,
    StartWindow,
}

impl RateLimitEntry {
    fn new(timeline: Timeline, limit: u32, now: Instant) -> Self {
        Self {
            timeline,
            limit,
            count: 0,
            window_start: now,
        }
    }

    fn evaluate(&self, now: Instant) -> Result<Step, Duration> {
        if self.limit == 0 {
            return Ok(Step::Skip);
        }
        if self.count == 0 {
            return Ok(Step::StartWindow);
        }
        if self.count < self.limit {
            return Ok(Step::Increment);
        }

        // over limit, unless the window already ran out
        let elapsed = now.saturating_duration_since(self.window_start);
        let window = self.timeline.window();
        if elapsed < window {
            Err(window - elapsed)
        } else {
            Ok(Step::StartWindow)
        }
    }

    fn apply(&mut self, step: Step, now: Instant) {
        match step {
            Step::Skip => {}
            Step::Increment => self.count += 1,
            Step::StartWindow => {
                self.window_start = now;
                self.count = 1;
            }
        }
    }
}

/// Process-wide request counter shared by every worker.
///
/// Each outbound call must go through [`RateGate::attempt`] first. The
/// configured ceilings bound the sum of requests from all workers.
#[derive(Debug)]
pub struct RateGate {
    limits: RateLimits,
    entries: Mutex<[RateLimitEntry; 2]>,
}

impl RateGate {
    pub fn new(limits: RateLimits) -> Self {
        let now = Instant::now();
        Self {
            limits,
            entries: Mutex::new([
                RateLimitEntry::new(Timeline::Second, limits.per_second, now),
                RateLimitEntry::new(Timeline::Minute, limits.per_minute, now),
            ]),
        }
    }

    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    pub fn attempt(&self) -> Admission {
        self.attempt_at(Instant::now())
    }

    /// Counts an attempt made at `now`.
    ///
    /// Every timeline is checked before any counter moves, so a rejection
    /// leaves all counters untouched. The first rejecting timeline wins.
    pub fn attempt_at(&self, now: Instant) -> Admission {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let mut steps = Vec::with_capacity(entries.len());
        for entry in entries.iter() {
            match entry.evaluate(now) {
                Ok(step) => steps.push(step),
                Err(wait) => {
                    return Admission::Rejected {
                        timeline: entry.timeline,
                        wait,
                    };
                }
            }
        }

        for (entry, step) in entries.iter_mut().zip(steps) {
            entry.apply(step, now);
        }
        Admission::Allowed
    }

    // Requests counted in the current window of a timeline
    pub fn count(&self, timeline: Timeline) -> u32 {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .find(|e| e.timeline == timeline)
            .map(|e| e.count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(per_second: u32, per_minute: u32) -> RateGate {
        RateGate::new(RateLimits {
            per_second,
            per_minute,
        })
    }

    #[test]
    fn test_unlimited_gate_always_allows() {
        let gate = gate(0, 0);
        let now = Instant::now();
        for _ in 0..1000 {
            assert_eq!(gate.attempt_at(now), Admission::Allowed);
        }
        assert_eq!(gate.count(Timeline::Second), 0);
        assert_eq!(gate.count(Timeline::Minute), 0);
    }

    #[test]
    fn test_two_per_second_rejects_third_attempt() {
        let gate = gate(2, 0);
        let t0 = Instant::now();

        assert!(gate.attempt_at(t0).is_allowed());
        assert!(gate.attempt_at(t0).is_allowed());
        assert_eq!(
            gate.attempt_at(t0),
            Admission::Rejected {
                timeline: Timeline::Second,
                wait: Duration::from_secs(1),
            }
        );

        // after waiting out the window a fresh one starts
        let t1 = t0 + Duration::from_secs(1);
        assert!(gate.attempt_at(t1).is_allowed());
        assert_eq!(gate.count(Timeline::Second), 1);
    }

    #[test]
    fn test_wait_is_remaining_window() {
        let gate = gate(1, 0);
        let t0 = Instant::now();
        assert!(gate.attempt_at(t0).is_allowed());

        let later = t0 + Duration::from_millis(300);
        match gate.attempt_at(later) {
            Admission::Rejected { timeline, wait } => {
                assert_eq!(timeline, Timeline::Second);
                assert_eq!(wait, Duration::from_millis(700));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_at_most_limit_allowed_within_window() {
        let gate = gate(5, 0);
        let t0 = Instant::now();
        let allowed = (0..20)
            .map(|i| gate.attempt_at(t0 + Duration::from_millis(i * 40)))
            .filter(Admission::is_allowed)
            .count();
        // 20 attempts over 800ms all fall inside one window
        assert_eq!(allowed, 5);
    }

    #[test]
    fn test_under_limit_does_not_reset_window() {
        let gate = gate(3, 0);
        let t0 = Instant::now();
        assert!(gate.attempt_at(t0).is_allowed());
        // count below limit keeps counting even past the window length
        assert!(gate.attempt_at(t0 + Duration::from_secs(5)).is_allowed());
        assert_eq!(gate.count(Timeline::Second), 2);
    }

    #[test]
    fn test_minute_timeline_rejects_with_remaining_minute() {
        let gate = gate(0, 2);
        let t0 = Instant::now();
        assert!(gate.attempt_at(t0).is_allowed());
        assert!(gate.attempt_at(t0 + Duration::from_secs(10)).is_allowed());
        assert_eq!(
            gate.attempt_at(t0 + Duration::from_secs(15)),
            Admission::Rejected {
                timeline: Timeline::Minute,
                wait: Duration::from_secs(45),
            }
        );
        assert!(gate.attempt_at(t0 + Duration::from_secs(60)).is_allowed());
    }

    #[test]
    fn test_rejection_leaves_other_timeline_untouched() {
        let gate = gate(10, 1);
        let t0 = Instant::now();
        assert!(gate.attempt_at(t0).is_allowed());
        assert_eq!(gate.count(Timeline::Second), 1);

        let rejected = gate.attempt_at(t0 + Duration::from_millis(10));
        assert!(matches!(
            rejected,
            Admission::Rejected {
                timeline: Timeline::Minute,
                ..
            }
        ));
        assert_eq!(gate.count(Timeline::Second), 1);
    }

    #[test]
    fn test_second_timeline_reported_first() {
        let gate = gate(1, 1);
        let t0 = Instant::now();
        assert!(gate.attempt_at(t0).is_allowed());
        assert!(matches!(
            gate.attempt_at(t0),
            Admission::Rejected {
                timeline: Timeline::Second,
                ..
            }
        ));
    }

    #[test]
    fn test_limits_accessor() {
        let gate = gate(20, 50);
        assert_eq!(
            gate.limits(),
            RateLimits {
                per_second: 20,
                per_minute: 50
            }
        );
    }
}
