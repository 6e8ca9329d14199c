use crate::classify::{BlockCounters, ResponseClassifier};
use sart_core::{BlockKind, RawResponse, TrialOutcome};
use std::time::Duration;

/// Performance of one finished block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSummary {
    pub kind: BlockKind,
    pub trials: usize,
    pub go_accuracy: f64,
    pub nogo_accuracy: f64,
    /// Mean latency of correct go trials.
    pub mean_reaction_time: Duration,
    pub counters: BlockCounters,
}

/// Owns the trial log and counters of a single block.
#[derive(Debug, Clone)]
pub struct BlockAggregator {
    kind: BlockKind,
    classifier: ResponseClassifier,
    counters: BlockCounters,
    log: Vec<TrialOutcome>,
}

impl BlockAggregator {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            classifier: ResponseClassifier,
            counters: BlockCounters::default(),
            log: Vec::new(),
        }
    }

    /// Scores the response, updates the counters and appends the outcome.
    pub fn record(&mut self, raw: RawResponse) -> &TrialOutcome {
        let outcome = self.classifier.classify(raw, &mut self.counters);
        self.log.push(outcome);
        &self.log[self.log.len() - 1]
    }

    pub fn trials(&self) -> &[TrialOutcome] {
        &self.log
    }

    pub fn counters(&self) -> &BlockCounters {
        &self.counters
    }

    pub fn summarize(&self) -> BlockSummary {
        let c = &self.counters;
        BlockSummary {
            kind: self.kind,
            trials: self.log.len(),
            go_accuracy: ratio(c.go_correct, c.go_correct + c.go_omissions),
            nogo_accuracy: ratio(c.nogo_correct, c.nogo_correct + c.nogo_commissions),
            mean_reaction_time: mean(&c.reaction_times),
            counters: c.clone(),
        }
    }
}

fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn mean(times: &[Duration]) -> Duration {
    if times.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = times.iter().sum();
    total / times.len() as u32
}
