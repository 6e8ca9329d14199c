mod common;

use common::{Act, RecordingDisplay, ScriptedInput, space_after};
use sart_core::{Digit, Key, StimulusType, TrialSpec};
use sart_experiment::{AbortSignal, SartError, TrialDurations, TrialRunner};
use sart_timing::{ManualTimer, Timer};
use std::time::Duration;

fn durations() -> TrialDurations {
    TrialDurations {
        fixation: Duration::from_millis(500),
        digit: Duration::from_millis(250),
        mask: Duration::from_millis(900),
    }
}

fn go_trial() -> TrialSpec {
    TrialSpec::new(0, Digit::new(7).unwrap(), Digit::new(3).unwrap())
}

struct Rig {
    timer: ManualTimer,
    abort: AbortSignal,
    display: RecordingDisplay,
    input: ScriptedInput,
}

fn rig(script: Vec<Act>) -> Rig {
    let timer = ManualTimer::new();
    let abort = AbortSignal::new();
    Rig {
        display: RecordingDisplay::new(timer.clone()),
        input: ScriptedInput::new(timer.clone(), abort.clone(), script),
        timer,
        abort,
    }
}

impl Rig {
    fn run(&mut self, spec: TrialSpec) -> Result<sart_core::RawResponse, SartError> {
        TrialRunner::new(durations()).run(
            spec,
            1,
            &self.timer,
            &mut self.display,
            &mut self.input,
            &self.abort,
        )
    }
}

#[test]
fn presents_fixation_digit_then_blank() {
    let mut rig = rig(vec![Act::Nothing]);
    rig.run(go_trial()).unwrap();

    assert_eq!(
        rig.display.stimuli(),
        vec![
            StimulusType::Fixation,
            StimulusType::Digit {
                digit: Digit::new(7).unwrap(),
                size: 1
            },
            StimulusType::Blank,
        ]
    );
    let onsets: Vec<u64> = rig.display.frames.iter().map(|(_, at)| *at).collect();
    assert_eq!(onsets, vec![0, 500_000_000, 750_000_000]);
}

#[test]
fn trial_length_does_not_depend_on_the_response() {
    for act in [Act::Nothing, space_after(40), space_after(249), space_after(700)] {
        let mut rig = rig(vec![act]);
        rig.run(go_trial()).unwrap();
        assert_eq!(rig.timer.reading(), durations().total(), "{act:?}");
    }
}

#[test]
fn press_in_digit_window_is_captured_without_mask_wait() {
    let mut rig = rig(vec![space_after(120)]);
    let raw = rig.run(go_trial()).unwrap();

    assert!(raw.responded);
    assert_eq!(raw.reaction_time, Some(Duration::from_millis(120)));
    assert_eq!(rig.input.waits, 1);
}

#[test]
fn press_in_mask_is_timed_from_digit_onset() {
    let mut rig = rig(vec![space_after(600)]);
    let raw = rig.run(go_trial()).unwrap();

    assert!(raw.responded);
    assert_eq!(raw.reaction_time, Some(Duration::from_millis(600)));
    assert_eq!(rig.input.waits, 2);
}

#[test]
fn press_after_the_mask_is_not_a_response() {
    let mut rig = rig(vec![space_after(1_300)]);
    let raw = rig.run(go_trial()).unwrap();

    assert!(!raw.responded);
    assert_eq!(raw.reaction_time, None);
}

#[test]
fn other_keys_are_ignored() {
    let mut rig = rig(vec![Act::Press {
        key: Key::Number(4),
        after: Duration::from_millis(100),
    }]);
    let raw = rig.run(go_trial()).unwrap();
    assert!(!raw.responded);
}

#[test]
fn abort_before_start_shows_nothing() {
    let mut rig = rig(vec![Act::Nothing]);
    rig.abort.raise();

    assert!(matches!(rig.run(go_trial()), Err(SartError::Aborted)));
    assert!(rig.display.frames.is_empty());
}

#[test]
fn abort_during_digit_skips_the_mask() {
    let mut rig = rig(vec![Act::Abort]);

    assert!(matches!(rig.run(go_trial()), Err(SartError::Aborted)));
    assert!(!rig.display.stimuli().contains(&StimulusType::Blank));
}

#[test]
fn display_failure_is_a_device_error() {
    let mut rig = rig(vec![Act::Nothing]);
    rig.display.fail_after = Some(1);

    let err = rig.run(go_trial()).unwrap_err();
    assert!(matches!(err, SartError::InputDevice(_)));
}

#[test]
fn timestamps_come_from_the_shared_clock() {
    let mut rig = rig(vec![Act::Nothing, space_after(90)]);
    rig.run(go_trial()).unwrap();
    let start = rig.timer.now();

    let spec = TrialSpec::new(1, Digit::new(5).unwrap(), Digit::new(3).unwrap());
    let raw = rig.run(spec).unwrap();
    assert_eq!(raw.reaction_time, Some(Duration::from_millis(90)));
    assert_eq!(rig.timer.elapsed(start), durations().total());
}
