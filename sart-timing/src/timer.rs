use std::time::{Duration, Instant};

/// Trait for high-precision timers
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);

    /// Sleeps until `window` has passed since `since`. Returns at once if it already has.
    fn hold(&self, since: Self::Timestamp, window: Duration) {
        let spent = self.elapsed(since);
        if spent < window {
            self.sleep(window - spent);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CalibrationStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

/// Monotonic clock anchored at construction. Clones share the anchor, so
/// timestamps taken on different threads are comparable.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub frame_times: Vec<Duration>,
    pub max_samples: usize,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }

    pub fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.remove(0);
        }
        self.frame_times.push(d);
    }

    pub fn frame_count(&self) -> usize {
        self.frame_times.len()
    }

    pub fn calibration_stats(&self) -> CalibrationStats {
        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        if times.is_empty() {
            return CalibrationStats::default();
        }
        let sum: f64 = times.iter().sum();
        let avg = sum / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        self.hybrid_sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, EINTR, clock_nanosleep, timespec};

        let mut req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut rem = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // Resume with the remainder when a signal interrupts the sleep.
        loop {
            let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) };
            if rc != EINTR {
                if rc != 0 {
                    tracing::warn!(rc, "clock_nanosleep failed");
                }
                break;
            }
            req = rem;
        }
    }

    /// OS sleep for the bulk of the wait, then spin through the last millisecond.
    #[cfg(not(target_os = "linux"))]
    fn hybrid_sleep(&self, duration: Duration) {
        const SPIN: Duration = Duration::from_millis(1);
        let deadline = Instant::now() + duration;
        if duration > SPIN {
            std::thread::sleep(duration - SPIN);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_waits_at_least_the_requested_time() {
        let timer = HighPrecisionTimer::new();
        let t0 = timer.now();
        timer.sleep(Duration::from_millis(5));
        assert!(timer.elapsed(t0) >= Duration::from_millis(5));
    }

    #[test]
    fn clones_share_the_anchor() {
        let timer = HighPrecisionTimer::new();
        let clone = timer.clone();
        let a = timer.now();
        let b = clone.now();
        assert!(b >= a);
    }

    #[test]
    fn frame_buffer_is_bounded() {
        let mut timer = HighPrecisionTimer::new();
        timer.max_samples = 3;
        for ms in 1..=5 {
            timer.record_frame(Duration::from_millis(ms));
        }
        assert_eq!(timer.frame_count(), 3);
        let stats = timer.calibration_stats();
        assert_eq!(stats.samples, 3);
        assert_eq!(stats.min_frame_time_ns, 3_000_000.0);
        assert_eq!(stats.max_frame_time_ns, 5_000_000.0);
        assert!((stats.average_frame_time_ns - 4_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = HighPrecisionTimer::new().calibration_stats();
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.effective_fps, 0.0);
    }
}
