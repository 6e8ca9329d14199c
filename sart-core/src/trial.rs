use crate::input::Key;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A single stimulus digit, 0-9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is not a single digit")]
pub struct InvalidDigit(pub u8);

impl Digit {
    pub const MAX: u8 = 9;

    pub fn new(value: u8) -> Result<Self, InvalidDigit> {
        if value <= Self::MAX {
            Ok(Digit(value))
        } else {
            Err(InvalidDigit(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// All ten digits in ascending order.
    pub fn all() -> impl Iterator<Item = Digit> {
        (0..=Self::MAX).map(Digit)
    }
}

impl TryFrom<u8> for Digit {
    type Error = InvalidDigit;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Digit::new(value)
    }
}

impl From<Digit> for u8 {
    fn from(d: Digit) -> u8 {
        d.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Fixation,
    StimulusVisible,
    Mask,
    Resolved,
}

/// Position and content of one trial, fixed once the block sequence exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialSpec {
    pub index: usize,
    pub digit: Digit,
    pub is_target: bool,
}

impl TrialSpec {
    pub fn new(index: usize, digit: Digit, target: Digit) -> Self {
        Self {
            index,
            digit,
            is_target: digit == target,
        }
    }
}

/// What the trial runner observed, before scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawResponse {
    pub spec: TrialSpec,
    pub responded: bool,
    /// Latency from digit onset to the first captured press.
    pub reaction_time: Option<Duration>,
}

/// Recorded result per trial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    pub spec: TrialSpec,
    pub responded: bool,
    pub reaction_time: Option<Duration>,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub trial_index: usize,
    pub attention_rating: Option<Key>,
    pub awareness_rating: Option<Key>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_rejects_values_above_nine() {
        assert!(Digit::new(9).is_ok());
        assert_eq!(Digit::new(10), Err(InvalidDigit(10)));
        assert_eq!(InvalidDigit(12).to_string(), "12 is not a single digit");
    }

    #[test]
    fn spec_marks_target_digit() {
        let target = Digit::new(3).unwrap();
        assert!(TrialSpec::new(0, target, target).is_target);
        assert!(!TrialSpec::new(1, Digit::new(4).unwrap(), target).is_target);
    }

    #[test]
    fn all_yields_ten_digits() {
        assert_eq!(Digit::all().count(), 10);
    }
}
