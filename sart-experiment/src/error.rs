use std::path::PathBuf;
use thiserror::Error;

/// Invalid session parameters. Raised before any trial runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target probability must be within [0, 1], got {0}")]
    TargetProbability(f64),
    #[error("{block} trial count must be at least {min}, got {got}")]
    TrialCount {
        block: &'static str,
        min: usize,
        got: usize,
    },
    #[error("target digit must be 0-9, got {0}")]
    TargetDigit(u8),
    #[error("probe interval must be positive")]
    ProbeInterval,
    #[error("{0} duration must be positive")]
    Duration(&'static str),
    #[error("digit heights must be a non-empty list of values in (0, 2]")]
    DigitHeights,
    #[error("participant id {0:?} must be 'a' followed by 8 digits")]
    ParticipantId(String),
    #[error("session {0:?} must be a number from 1 to 6")]
    Session(String),
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of the display or input collaborator.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{0} channel disconnected")]
    Disconnected(&'static str),
    #[error("render failed: {0}")]
    Render(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure persisting a record.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("data file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SartError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("input device error: {0}")]
    InputDevice(#[from] DeviceError),
    #[error("data sink error: {0}")]
    DataSink(#[from] SinkError),
    #[error("session aborted by operator")]
    Aborted,
}

pub type Result<T, E = SartError> = std::result::Result<T, E>;
