pub mod input;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use input::{Key, KeyPress};
pub use phase::{BlockKind, Phase, SartPhase};
pub use stimulus::{CacheId, Screen, Stimulus, StimulusType, Tone};
pub use trial::{Digit, InvalidDigit, ProbeResult, RawResponse, TrialOutcome, TrialSpec, TrialState};
