//! Practice-block feedback texts.

use sart_core::{Digit, StimulusType, Tone};

pub fn feedback_message(is_target: bool, correct: bool, target: Digit) -> (String, Tone) {
    match (is_target, correct) {
        (true, true) => (
            format!("Correct! You did not respond to {target}."),
            Tone::Positive,
        ),
        (true, false) => (
            format!("Incorrect. Do not respond to {target}."),
            Tone::Negative,
        ),
        (false, true) => ("Correct! You responded.".to_string(), Tone::Positive),
        (false, false) => (
            format!("Incorrect. Please press SPACE when the digit is not {target}."),
            Tone::Negative,
        ),
    }
}

pub fn feedback_stimulus(is_target: bool, correct: bool, target: Digit) -> StimulusType {
    let (message, tone) = feedback_message(is_target, correct, target);
    StimulusType::feedback(&message, tone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_target() {
        let target = Digit::new(3).unwrap();
        let (msg, tone) = feedback_message(true, false, target);
        assert_eq!(msg, "Incorrect. Do not respond to 3.");
        assert_eq!(tone, Tone::Negative);

        let (msg, tone) = feedback_message(false, true, target);
        assert_eq!(msg, "Correct! You responded.");
        assert_eq!(tone, Tone::Positive);
    }
}
