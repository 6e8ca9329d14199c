use crate::abort::AbortSignal;
use crate::error::Result;
use crate::io::{InputSource, StimulusDisplay, prompt};
use sart_core::{ProbeResult, Screen};
use std::time::Duration;

/// Decides when the thought probes interrupt the trial stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeScheduler {
    pub interval: usize,
}

impl ProbeScheduler {
    pub fn new(interval: usize) -> Self {
        Self { interval }
    }

    pub fn should_probe(&self, trial_index: usize, is_practice: bool) -> bool {
        !is_practice && trial_index > 0 && self.interval > 0 && trial_index % self.interval == 0
    }

    /// Shows the attention and awareness probes, then the continue screen.
    pub fn collect<D, I>(
        &self,
        trial_index: usize,
        display: &mut D,
        input: &mut I,
        timeout: Option<Duration>,
        abort: &AbortSignal,
    ) -> Result<ProbeResult>
    where
        D: StimulusDisplay + ?Sized,
        I: InputSource + ?Sized,
    {
        tracing::info!(trial = trial_index, "probe pause");
        let attention = prompt(display, input, Screen::AttentionProbe, timeout, abort)?;
        let awareness = prompt(display, input, Screen::AwarenessProbe, timeout, abort)?;
        prompt(display, input, Screen::Continue, None, abort)?;

        Ok(ProbeResult {
            trial_index,
            attention_rating: attention.map(|p| p.key),
            awareness_rating: awareness.map(|p| p.key),
        })
    }
}
