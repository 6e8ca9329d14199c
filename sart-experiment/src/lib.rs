pub mod abort;
pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod feedback;
pub mod io;
pub mod probe;
pub mod sequence;
pub mod sink;
pub mod state;
pub mod trial;

pub use abort::AbortSignal;
pub use aggregate::{BlockAggregator, BlockSummary};
pub use classify::{BlockCounters, ResponseClassifier, Verdict};
pub use config::{ParticipantId, SessionConfig, SessionInfo, SessionNumber};
pub use error::{ConfigError, DeviceError, SartError, SinkError};
pub use io::{InputSource, StimulusDisplay};
pub use probe::ProbeScheduler;
pub use sequence::SequenceGenerator;
pub use sink::{DataSink, JsonLinesSink, MemorySink, Record};
pub use state::{ExperimentStateMachine, SessionReport};
pub use trial::{TrialDurations, TrialRunner};
