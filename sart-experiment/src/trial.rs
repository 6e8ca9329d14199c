//! One go/no-go trial: fixation, digit and mask, each held to a fixed deadline
//! while the first SPACE press is captured.

use crate::abort::AbortSignal;
use crate::error::{Result, SartError};
use crate::io::{InputSource, StimulusDisplay};
use sart_core::{Key, RawResponse, StimulusType, TrialSpec, TrialState};
use sart_timing::Timer;
use std::time::Duration;

/// Fixed windows of one trial. Each window always runs to its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialDurations {
    pub fixation: Duration,
    pub digit: Duration,
    pub mask: Duration,
}

impl TrialDurations {
    pub fn total(&self) -> Duration {
        self.fixation + self.digit + self.mask
    }
}

/// Drives one trial through fixation, digit and mask.
#[derive(Debug, Clone, Copy)]
pub struct TrialRunner {
    pub durations: TrialDurations,
}

impl TrialRunner {
    pub fn new(durations: TrialDurations) -> Self {
        Self { durations }
    }

    /// Runs the trial and returns the captured response.
    ///
    /// `size` selects the digit height. Only the first SPACE press counts; the
    /// latency is measured from the moment the digit frame was presented.
    /// Presses stamped before that moment belong to the previous trial and are
    /// skipped.
    pub fn run<T, D, I>(
        &self,
        spec: TrialSpec,
        size: u8,
        timer: &T,
        display: &mut D,
        input: &mut I,
        abort: &AbortSignal,
    ) -> Result<RawResponse>
    where
        T: Timer<Timestamp = u64>,
        D: StimulusDisplay + ?Sized,
        I: InputSource + ?Sized,
    {
        let mut state = TrialState::Fixation;
        let mut onset = None;
        let mut response = None;

        while state != TrialState::Resolved {
            if abort.is_raised() {
                tracing::debug!(trial = spec.index, ?state, "trial abandoned");
                return Err(SartError::Aborted);
            }

            state = match state {
                TrialState::Fixation => {
                    display.show(&StimulusType::Fixation)?;
                    let start = timer.now();
                    timer.hold(start, self.durations.fixation);
                    TrialState::StimulusVisible
                }
                TrialState::StimulusVisible => {
                    input.discard_pending();
                    display.show(&StimulusType::Digit {
                        digit: spec.digit,
                        size,
                    })?;
                    let shown = timer.now();
                    onset = Some(shown);
                    response = first_press(timer, input, shown, shown, self.durations.digit)?;
                    timer.hold(shown, self.durations.digit);
                    TrialState::Mask
                }
                TrialState::Mask => {
                    display.show(&StimulusType::Blank)?;
                    let start = timer.now();
                    if let (None, Some(shown)) = (response, onset) {
                        if !abort.is_raised() {
                            response =
                                first_press(timer, input, shown, start, self.durations.mask)?;
                        }
                    }
                    timer.hold(start, self.durations.mask);
                    TrialState::Resolved
                }
                TrialState::Resolved => TrialState::Resolved,
            };
        }

        let reaction_time = match (onset, response) {
            (Some(shown), Some(at)) => Some(Duration::from_nanos(at - shown)),
            _ => None,
        };
        if let Some(rt) = reaction_time {
            tracing::trace!(
                trial = spec.index,
                rt_ms = rt.as_secs_f64() * 1e3,
                "response captured"
            );
        }

        Ok(RawResponse {
            spec,
            responded: reaction_time.is_some(),
            reaction_time,
        })
    }
}

/// Waits until `window` has passed since `start` for a SPACE press stamped at
/// or after `onset`.
fn first_press<T, I>(
    timer: &T,
    input: &mut I,
    onset: u64,
    start: u64,
    window: Duration,
) -> Result<Option<u64>>
where
    T: Timer<Timestamp = u64>,
    I: InputSource + ?Sized,
{
    loop {
        let left = window.saturating_sub(timer.elapsed(start));
        if left.is_zero() {
            return Ok(None);
        }
        match input.wait_for_key(&[Key::Space], Some(left))? {
            Some(press) if press.timestamp_ns >= onset => return Ok(Some(press.timestamp_ns)),
            Some(press) => {
                tracing::debug!(
                    early_ns = onset - press.timestamp_ns,
                    "press stamped before digit onset skipped"
                );
            }
            None => return Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use sart_core::{Digit, KeyPress};
    use sart_timing::ManualTimer;
    use std::collections::VecDeque;

    const MS: u64 = 1_000_000;

    /// Hands out queued presses in order, whatever their stamps.
    struct QueuedInput {
        timer: ManualTimer,
        presses: VecDeque<KeyPress>,
    }

    impl InputSource for QueuedInput {
        fn wait_for_key(
            &mut self,
            allowed: &[Key],
            max_wait: Option<Duration>,
        ) -> std::result::Result<Option<KeyPress>, DeviceError> {
            let now = self.timer.now();
            let limit = max_wait.map_or(u64::MAX, |w| now + w.as_nanos() as u64);
            match self.presses.front() {
                Some(p) if allowed.contains(&p.key) && p.timestamp_ns <= limit => {
                    let press = self.presses.pop_front();
                    if let Some(p) = &press {
                        self.timer
                            .advance(Duration::from_nanos(p.timestamp_ns.saturating_sub(now)));
                    }
                    Ok(press)
                }
                _ => {
                    self.timer.sleep(max_wait.unwrap_or_default());
                    Ok(None)
                }
            }
        }

        // Presses in the queue arrived after the flush.
        fn discard_pending(&mut self) {}
    }

    /// Each flip takes one 10 ms frame.
    struct SlowDisplay {
        timer: ManualTimer,
    }

    impl StimulusDisplay for SlowDisplay {
        fn draw(&mut self, _stimulus: &StimulusType) -> std::result::Result<(), DeviceError> {
            Ok(())
        }

        fn present(&mut self) -> std::result::Result<(), DeviceError> {
            self.timer.advance(Duration::from_millis(10));
            Ok(())
        }
    }

    fn run_with(stamps_ms: &[u64]) -> (RawResponse, QueuedInput) {
        let timer = ManualTimer::new();
        let mut display = SlowDisplay {
            timer: timer.clone(),
        };
        let mut input = QueuedInput {
            timer: timer.clone(),
            presses: stamps_ms
                .iter()
                .map(|ms| KeyPress::new(Key::Space, ms * MS))
                .collect(),
        };
        let runner = TrialRunner::new(TrialDurations {
            fixation: Duration::from_millis(500),
            digit: Duration::from_millis(250),
            mask: Duration::from_millis(900),
        });
        let spec = TrialSpec::new(0, Digit::new(7).unwrap(), Digit::new(3).unwrap());
        let raw = runner
            .run(spec, 0, &timer, &mut display, &mut input, &AbortSignal::new())
            .unwrap();
        (raw, input)
    }

    // Fixation flips at 0-10 ms and holds to 510 ms; the digit is visible at 520 ms.

    #[test]
    fn only_the_first_press_counts() {
        let (raw, input) = run_with(&[600, 700]);
        assert_eq!(raw.reaction_time, Some(Duration::from_millis(80)));
        assert_eq!(input.presses.len(), 1);
    }

    #[test]
    fn press_stamped_before_digit_onset_is_skipped() {
        let (raw, input) = run_with(&[515, 640]);
        assert!(raw.responded);
        assert_eq!(raw.reaction_time, Some(Duration::from_millis(120)));
        assert!(input.presses.is_empty());
    }

    #[test]
    fn early_press_alone_is_no_response() {
        let (raw, _) = run_with(&[515]);
        assert!(!raw.responded);
        assert_eq!(raw.reaction_time, None);
    }

    #[test]
    fn press_at_onset_is_zero_latency() {
        let (raw, _) = run_with(&[520]);
        assert_eq!(raw.reaction_time, Some(Duration::ZERO));
    }
}
