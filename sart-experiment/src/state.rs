use crate::abort::AbortSignal;
use crate::aggregate::{BlockAggregator, BlockSummary};
use crate::config::SessionConfig;
use crate::error::{ConfigError, Result, SartError};
use crate::feedback::feedback_stimulus;
use crate::io::{InputSource, StimulusDisplay, prompt};
use crate::probe::ProbeScheduler;
use crate::sequence::SequenceGenerator;
use crate::sink::{DataSink, Record};
use crate::trial::TrialRunner;
use rand::Rng;
use sart_core::{BlockKind, Digit, Phase, TrialSpec};
use sart_timing::Timer;

/// Summaries of the blocks that ran, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub blocks: Vec<BlockSummary>,
}

impl SessionReport {
    pub fn block(&self, kind: BlockKind) -> Option<&BlockSummary> {
        self.blocks.iter().find(|b| b.kind == kind)
    }
}

/// Walks the session phases, running screens and trial blocks against the
/// display, input and sink collaborators.
pub struct ExperimentStateMachine<P, T, D, I, S, R>
where
    P: Phase,
    T: Timer<Timestamp = u64>,
    D: StimulusDisplay,
    I: InputSource,
    S: DataSink,
    R: Rng,
{
    pub phase: P,
    pub config: SessionConfig,
    pub timer: T,
    pub display: D,
    pub input: I,
    pub sink: S,
    pub rng: R,
    abort: AbortSignal,
    target: Digit,
    runner: TrialRunner,
    generator: SequenceGenerator,
    probes: ProbeScheduler,
    summaries: Vec<BlockSummary>,
    trials_completed: usize,
}

impl<P, T, D, I, S, R> ExperimentStateMachine<P, T, D, I, S, R>
where
    P: Phase,
    T: Timer<Timestamp = u64>,
    D: StimulusDisplay,
    I: InputSource,
    S: DataSink,
    R: Rng,
{
    /// Validates `config` before anything else is built.
    pub fn new(
        config: SessionConfig,
        timer: T,
        display: D,
        input: I,
        sink: S,
        rng: R,
        abort: AbortSignal,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let target = config.target()?;
        Ok(Self {
            phase: P::default(),
            runner: TrialRunner::new(config.trial_durations()),
            generator: SequenceGenerator::new(target, config.target_probability),
            probes: ProbeScheduler::new(config.probe_interval),
            config,
            timer,
            display,
            input,
            sink,
            rng,
            abort,
            target,
            summaries: Vec::new(),
            trials_completed: 0,
        })
    }

    pub fn current_phase(&self) -> &P {
        &self.phase
    }

    /// Trials scored and written so far, across blocks.
    pub fn trials_completed(&self) -> usize {
        self.trials_completed
    }

    /// Runs every remaining phase. The sink is flushed whatever the outcome.
    pub fn run(&mut self) -> Result<SessionReport> {
        let result = self.run_phases();
        let flushed = self.sink.flush();

        match &result {
            Ok(_) => tracing::info!(trials = self.trials_completed, "session complete"),
            Err(SartError::Aborted) => tracing::warn!(
                trials = self.trials_completed,
                phase = ?self.phase,
                "session aborted, completed trials are saved"
            ),
            Err(e) => tracing::error!(phase = ?self.phase, "session failed: {e}"),
        }

        match (result, flushed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Err(flush_err)) => {
                tracing::error!("flush after failure also failed: {flush_err}");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    fn run_phases(&mut self) -> Result<SessionReport> {
        loop {
            if self.abort.is_raised() {
                return Err(SartError::Aborted);
            }

            if let Some(screen) = self.phase.screen() {
                prompt(
                    &mut self.display,
                    &mut self.input,
                    screen,
                    None,
                    &self.abort,
                )?;
            }

            if let Some(kind) = self.phase.block() {
                if let Some(summary) = self.run_block(kind)? {
                    if kind == BlockKind::Experiment {
                        self.sink.add_record(&Record::summary(&summary))?;
                    }
                    self.summaries.push(summary);
                }
            }

            match self.phase.next() {
                Some(next) => {
                    tracing::debug!(from = ?self.phase, to = ?next, "phase advanced");
                    self.phase = next;
                }
                None => break,
            }
        }

        Ok(SessionReport {
            blocks: self.summaries.clone(),
        })
    }

    /// Runs one block. Returns `None` when the block has no trials configured.
    pub fn run_block(&mut self, kind: BlockKind) -> Result<Option<BlockSummary>> {
        let num_trials = self.config.trials_for(kind);
        if num_trials == 0 {
            tracing::info!(?kind, "block has no trials, skipping");
            return Ok(None);
        }

        let digits = self.generator.generate(num_trials, &mut self.rng)?;
        let mut aggregator = BlockAggregator::new(kind);
        tracing::info!(?kind, num_trials, target = %self.target, "block started");

        for (index, digit) in digits.into_iter().enumerate() {
            if self.probes.should_probe(index, kind.is_practice()) {
                let probe = self.probes.collect(
                    index,
                    &mut self.display,
                    &mut self.input,
                    self.config.probe_timeout(),
                    &self.abort,
                )?;
                self.sink.add_record(&Record::probe(kind, &probe))?;
            }

            let spec = TrialSpec::new(index, digit, self.target);
            let size = self.rng.random_range(0..self.config.digit_heights.len()) as u8;
            let raw = self.runner.run(
                spec,
                size,
                &self.timer,
                &mut self.display,
                &mut self.input,
                &self.abort,
            )?;
            let outcome = *aggregator.record(raw);
            self.sink.add_record(&Record::trial(
                kind,
                &outcome,
                self.config.digit_height(size),
            ))?;
            self.trials_completed += 1;

            // No feedback after the last practice trial.
            if kind.is_practice() && index + 1 < num_trials {
                self.display.show(&feedback_stimulus(
                    spec.is_target,
                    outcome.correct,
                    self.target,
                ))?;
                self.timer.sleep(self.config.feedback_duration());
            }
        }

        let summary = aggregator.summarize();
        tracing::info!(
            ?kind,
            go_accuracy = summary.go_accuracy,
            nogo_accuracy = summary.nogo_accuracy,
            mean_rt_ms = summary.mean_reaction_time.as_secs_f64() * 1e3,
            "block finished"
        );
        Ok(Some(summary))
    }
}
