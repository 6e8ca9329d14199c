//! Go/no-go scoring.

use sart_core::{RawResponse, TrialOutcome};
use std::time::Duration;

/// One row of the go/no-go rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Target withheld.
    CorrectRejection,
    /// Target answered.
    Commission,
    /// Non-target answered.
    Hit,
    /// Non-target missed.
    Omission,
}

impl Verdict {
    pub fn of(is_target: bool, responded: bool) -> Self {
        match (is_target, responded) {
            (true, false) => Verdict::CorrectRejection,
            (true, true) => Verdict::Commission,
            (false, true) => Verdict::Hit,
            (false, false) => Verdict::Omission,
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::CorrectRejection | Verdict::Hit)
    }
}

/// Running tallies for one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockCounters {
    pub go_correct: u32,
    pub go_omissions: u32,
    pub nogo_correct: u32,
    pub nogo_commissions: u32,
    /// Latencies of correct go trials, in trial order.
    pub reaction_times: Vec<Duration>,
}

impl BlockCounters {
    pub fn apply(&mut self, verdict: Verdict, reaction_time: Option<Duration>) {
        match verdict {
            Verdict::CorrectRejection => self.nogo_correct += 1,
            Verdict::Commission => self.nogo_commissions += 1,
            Verdict::Hit => {
                self.go_correct += 1;
                if let Some(rt) = reaction_time {
                    self.reaction_times.push(rt);
                }
            }
            Verdict::Omission => self.go_omissions += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseClassifier;

impl ResponseClassifier {
    /// Scores `raw` and folds the verdict into `counters`.
    pub fn classify(&self, raw: RawResponse, counters: &mut BlockCounters) -> TrialOutcome {
        let verdict = Verdict::of(raw.spec.is_target, raw.responded);
        counters.apply(verdict, raw.reaction_time);
        tracing::debug!(
            trial = raw.spec.index,
            digit = %raw.spec.digit,
            ?verdict,
            "trial scored"
        );
        TrialOutcome {
            spec: raw.spec,
            responded: raw.responded,
            reaction_time: raw.reaction_time,
            correct: verdict.is_correct(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sart_core::{Digit, TrialSpec};

    fn raw(digit: u8, responded: bool, rt_ms: Option<u64>) -> RawResponse {
        let target = Digit::new(3).unwrap();
        RawResponse {
            spec: TrialSpec::new(0, Digit::new(digit).unwrap(), target),
            responded,
            reaction_time: rt_ms.map(Duration::from_millis),
        }
    }

    #[test]
    fn withheld_target_is_correct_rejection() {
        let mut counters = BlockCounters::default();
        let outcome = ResponseClassifier.classify(raw(3, false, None), &mut counters);
        assert!(outcome.correct);
        assert_eq!(counters.nogo_correct, 1);
        assert_eq!(
            counters,
            BlockCounters {
                nogo_correct: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn answered_target_is_commission() {
        let mut counters = BlockCounters::default();
        let outcome = ResponseClassifier.classify(raw(3, true, Some(310)), &mut counters);
        assert!(!outcome.correct);
        assert_eq!(counters.nogo_commissions, 1);
        assert!(counters.reaction_times.is_empty());
    }

    #[test]
    fn answered_non_target_records_latency() {
        let mut counters = BlockCounters::default();
        let outcome = ResponseClassifier.classify(raw(5, true, Some(420)), &mut counters);
        assert!(outcome.correct);
        assert_eq!(counters.go_correct, 1);
        assert_eq!(counters.reaction_times, vec![Duration::from_millis(420)]);
    }

    #[test]
    fn missed_non_target_is_omission() {
        let mut counters = BlockCounters::default();
        let outcome = ResponseClassifier.classify(raw(8, false, None), &mut counters);
        assert!(!outcome.correct);
        assert_eq!(counters.go_omissions, 1);
    }

    #[test]
    fn every_pair_maps_to_one_verdict() {
        let table = [
            (true, false, Verdict::CorrectRejection, true),
            (true, true, Verdict::Commission, false),
            (false, true, Verdict::Hit, true),
            (false, false, Verdict::Omission, false),
        ];
        for (is_target, responded, verdict, correct) in table {
            assert_eq!(Verdict::of(is_target, responded), verdict);
            assert_eq!(verdict.is_correct(), correct);
        }
    }
}
