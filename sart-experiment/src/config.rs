use crate::error::ConfigError;
use crate::trial::TrialDurations;
use chrono::{DateTime, Local};
use sart_core::{BlockKind, Digit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Session parameters. Every field has a default, so a config file only
/// needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub practice_trials: usize,
    pub experiment_trials: usize,
    pub fixation_duration_ms: u64,
    pub digit_duration_ms: u64,
    pub mask_duration_ms: u64,
    pub feedback_duration_ms: u64,
    pub target_probability: f64,
    pub target_digit: u8,
    pub probe_interval: usize,
    /// Digit heights in normalised units (fraction of half the screen height),
    /// one drawn at random per trial.
    pub digit_heights: Vec<f32>,
    /// `None` waits for a rating indefinitely.
    pub probe_timeout_ms: Option<u64>,
    pub screens_dir: Option<PathBuf>,
    pub font_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            practice_trials: 10,
            experiment_trials: 100,
            fixation_duration_ms: 500,
            digit_duration_ms: 250,
            mask_duration_ms: 900,
            feedback_duration_ms: 1500,
            target_probability: 0.11,
            target_digit: 3,
            probe_interval: 20,
            digit_heights: vec![0.2, 0.3, 0.4],
            probe_timeout_ms: None,
            screens_dir: None,
            font_path: PathBuf::from("assets/DejaVuSans.ttf"),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.target_probability) {
            return Err(ConfigError::TargetProbability(self.target_probability));
        }
        if self.experiment_trials < 1 {
            return Err(ConfigError::TrialCount {
                block: "experiment",
                min: 1,
                got: self.experiment_trials,
            });
        }
        self.target()?;
        if self.probe_interval == 0 {
            return Err(ConfigError::ProbeInterval);
        }
        for (name, ms) in [
            ("fixation", self.fixation_duration_ms),
            ("digit", self.digit_duration_ms),
            ("mask", self.mask_duration_ms),
        ] {
            if ms == 0 {
                return Err(ConfigError::Duration(name));
            }
        }
        if self.digit_heights.is_empty()
            || self.digit_heights.len() > u8::MAX as usize
            || self
                .digit_heights
                .iter()
                .any(|h| !h.is_finite() || *h <= 0.0 || *h > 2.0)
        {
            return Err(ConfigError::DigitHeights);
        }
        Ok(())
    }

    pub fn target(&self) -> Result<Digit, ConfigError> {
        Digit::new(self.target_digit).map_err(|e| ConfigError::TargetDigit(e.0))
    }

    pub fn trials_for(&self, kind: BlockKind) -> usize {
        match kind {
            BlockKind::Practice => self.practice_trials,
            BlockKind::Experiment => self.experiment_trials,
        }
    }

    pub fn trial_durations(&self) -> TrialDurations {
        TrialDurations {
            fixation: Duration::from_millis(self.fixation_duration_ms),
            digit: Duration::from_millis(self.digit_duration_ms),
            mask: Duration::from_millis(self.mask_duration_ms),
        }
    }

    pub fn feedback_duration(&self) -> Duration {
        Duration::from_millis(self.feedback_duration_ms)
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_ms.map(Duration::from_millis)
    }

    /// Height (normalised units) for a digit size index.
    pub fn digit_height(&self, size: u8) -> Option<f32> {
        self.digit_heights.get(size as usize).copied()
    }
}

/// Participant identifier: `a` followed by eight digits, e.g. `a12345678`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl FromStr for ParticipantId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let valid = s.chars().count() == 9
            && chars.next().is_some_and(|c| c.eq_ignore_ascii_case(&'a'))
            && chars.all(|c| c.is_ascii_digit());
        if valid {
            Ok(ParticipantId(s.to_string()))
        } else {
            Err(ConfigError::ParticipantId(s.to_string()))
        }
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SessionNumber(u8);

impl SessionNumber {
    pub const MAX: u8 = 6;

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl FromStr for SessionNumber {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u8>() {
            Ok(n) if (1..=Self::MAX).contains(&n) => Ok(SessionNumber(n)),
            _ => Err(ConfigError::Session(s.to_string())),
        }
    }
}

impl fmt::Display for SessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields stamped onto every record of the data file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub participant: ParticipantId,
    pub session: SessionNumber,
    pub date: String,
    pub time: String,
    pub target_digit: u8,
}

impl SessionInfo {
    pub fn new(
        participant: ParticipantId,
        session: SessionNumber,
        target: Digit,
        started: DateTime<Local>,
    ) -> Self {
        Self {
            participant,
            session,
            date: started.format("%Y-%m-%d").to_string(),
            time: started.format("%H:%M:%S").to_string(),
            target_digit: target.value(),
        }
    }

    pub fn data_file_name(&self) -> String {
        format!(
            "SART_{}_{}_{}.jsonl",
            self.participant, self.session, self.date
        )
    }
}
