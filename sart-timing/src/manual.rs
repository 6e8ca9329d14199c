//! Deterministic clock for driving the trial state machine in tests and
//! dry runs. Sleeping advances the clock instead of blocking.

use crate::timer::Timer;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns
            .fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Current reading as a duration since the clock started.
    pub fn reading(&self) -> Duration {
        Duration::from_nanos(self.now())
    }
}

impl Timer for ManualTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_advances_shared_clock() {
        let timer = ManualTimer::new();
        let other = timer.clone();
        timer.sleep(Duration::from_millis(250));
        assert_eq!(other.now(), 250_000_000);
    }

    #[test]
    fn hold_only_sleeps_the_remainder() {
        let timer = ManualTimer::new();
        let start = timer.now();
        timer.advance(Duration::from_millis(100));
        timer.hold(start, Duration::from_millis(250));
        assert_eq!(timer.reading(), Duration::from_millis(250));
        timer.hold(start, Duration::from_millis(250));
        assert_eq!(timer.reading(), Duration::from_millis(250));
    }
}
