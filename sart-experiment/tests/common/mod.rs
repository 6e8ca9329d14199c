#![allow(dead_code)]

use sart_core::{Key, KeyPress, StimulusType};
use sart_experiment::error::{DeviceError, SinkError};
use sart_experiment::{AbortSignal, DataSink, InputSource, Record, SessionConfig, StimulusDisplay};
use sart_timing::{ManualTimer, Timer};
use std::collections::VecDeque;
use std::time::Duration;

/// What the participant does in one wait context (one trial or one screen).
#[derive(Debug, Clone, Copy)]
pub enum Act {
    /// Presses `key` this long after the context opened.
    Press { key: Key, after: Duration },
    Nothing,
    /// Operator hits ESC.
    Abort,
}

pub fn space_after(ms: u64) -> Act {
    Act::Press {
        key: Key::Space,
        after: Duration::from_millis(ms),
    }
}

pub fn rating(n: u8) -> Act {
    Act::Press {
        key: Key::Number(n),
        after: Duration::from_millis(800),
    }
}

/// Input driven by a script of acts. Each `discard_pending` opens a new wait
/// context and takes the next act.
pub struct ScriptedInput {
    timer: ManualTimer,
    abort: AbortSignal,
    script: VecDeque<Act>,
    current: Option<(Act, u64)>,
    pub waits: usize,
}

impl ScriptedInput {
    pub fn new(timer: ManualTimer, abort: AbortSignal, script: Vec<Act>) -> Self {
        Self {
            timer,
            abort,
            script: script.into(),
            current: None,
            waits: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl InputSource for ScriptedInput {
    fn wait_for_key(
        &mut self,
        allowed: &[Key],
        max_wait: Option<Duration>,
    ) -> Result<Option<KeyPress>, DeviceError> {
        self.waits += 1;
        let now = self.timer.now();
        match self.current {
            Some((Act::Abort, _)) => {
                self.current = None;
                self.abort.raise();
                Ok(None)
            }
            Some((Act::Press { key, after }, anchor)) if allowed.contains(&key) => {
                let due = anchor + after.as_nanos() as u64;
                let within = match max_wait {
                    Some(w) => due <= now + w.as_nanos() as u64,
                    None => true,
                };
                if within {
                    self.current = None;
                    let at = due.max(now);
                    self.timer.advance(Duration::from_nanos(at - now));
                    return Ok(Some(KeyPress::new(key, at)));
                }
                self.timer.sleep(max_wait.unwrap_or_default());
                Ok(None)
            }
            _ => match max_wait {
                Some(w) => {
                    self.timer.sleep(w);
                    Ok(None)
                }
                None => Err(DeviceError::Disconnected("script exhausted")),
            },
        }
    }

    fn discard_pending(&mut self) {
        self.current = self.script.pop_front().map(|act| (act, self.timer.now()));
    }
}

/// Display that records every presented frame with its timestamp.
pub struct RecordingDisplay {
    timer: ManualTimer,
    back: Option<StimulusType>,
    pub frames: Vec<(StimulusType, u64)>,
    pub fail_after: Option<usize>,
}

impl RecordingDisplay {
    pub fn new(timer: ManualTimer) -> Self {
        Self {
            timer,
            back: None,
            frames: Vec::new(),
            fail_after: None,
        }
    }

    pub fn stimuli(&self) -> Vec<StimulusType> {
        self.frames.iter().map(|(s, _)| s.clone()).collect()
    }
}

impl StimulusDisplay for RecordingDisplay {
    fn draw(&mut self, stimulus: &StimulusType) -> Result<(), DeviceError> {
        self.back = Some(stimulus.clone());
        Ok(())
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        if self.fail_after.is_some_and(|n| self.frames.len() >= n) {
            return Err(DeviceError::Render("surface lost".into()));
        }
        if let Some(s) = self.back.take() {
            self.frames.push((s, self.timer.now()));
        }
        Ok(())
    }
}

/// Sink that refuses every write.
pub struct BrokenSink;

impl DataSink for BrokenSink {
    fn add_record(&mut self, _record: &Record) -> Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::other("disk full")))
    }
}

pub fn small_config(practice: usize, experiment: usize) -> SessionConfig {
    SessionConfig {
        practice_trials: practice,
        experiment_trials: experiment,
        ..SessionConfig::default()
    }
}
