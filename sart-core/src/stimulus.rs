use crate::input::Key;
use crate::trial::Digit;
use sart_cache::intern_text;

/// Defines stimuli and how the renderer caches their pixels
pub trait Stimulus: Clone + Send + Sync + std::fmt::Debug {
    /// Key into the renderer's pixmap cache; `None` for stimuli that draw nothing.
    fn cache_id(&self) -> Option<CacheId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheId {
    Fixation,
    Screen(Screen),
    Digit { digit: u8, size: u8 },
    Text(usize),
}

/// Full-screen pages between and inside blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Instructions,
    PracticeComplete,
    AttentionProbe,
    AwarenessProbe,
    Continue,
    Debrief,
}

impl Screen {
    pub const ALL: [Screen; 6] = [
        Screen::Instructions,
        Screen::PracticeComplete,
        Screen::AttentionProbe,
        Screen::AwarenessProbe,
        Screen::Continue,
        Screen::Debrief,
    ];

    /// Keys that dismiss the screen.
    pub fn accepted_keys(&self) -> &'static [Key] {
        match self {
            Screen::AttentionProbe | Screen::AwarenessProbe => &Key::RATINGS,
            _ => &[Key::Space],
        }
    }

    /// File stem of the optional image looked up in the screens directory.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Screen::Instructions => "sart_instructions",
            Screen::PracticeComplete => "sart_practice_complete",
            Screen::AttentionProbe => "sart_probe1",
            Screen::AwarenessProbe => "sart_probe2",
            Screen::Continue => "sart_continue",
            Screen::Debrief => "sart_end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Positive,
    Negative,
}

impl Tone {
    pub fn color(&self) -> [u8; 4] {
        match self {
            Tone::Positive => [0, 200, 0, 255],
            Tone::Negative => [220, 0, 0, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StimulusType {
    /// Cleared screen (mask period).
    Blank,
    Fixation,
    /// `size` indexes the configured digit heights.
    Digit { digit: Digit, size: u8 },
    /// Interned message id, see [`StimulusType::feedback`].
    Feedback { text_id: usize, tone: Tone },
    Screen(Screen),
}

impl StimulusType {
    pub fn feedback(message: &str, tone: Tone) -> Self {
        StimulusType::Feedback {
            text_id: intern_text(message),
            tone,
        }
    }
}

impl Stimulus for StimulusType {
    fn cache_id(&self) -> Option<CacheId> {
        match self {
            StimulusType::Blank => None,
            StimulusType::Fixation => Some(CacheId::Fixation),
            StimulusType::Digit { digit, size } => Some(CacheId::Digit {
                digit: digit.value(),
                size: *size,
            }),
            StimulusType::Feedback { text_id, .. } => Some(CacheId::Text(*text_id)),
            StimulusType::Screen(screen) => Some(CacheId::Screen(*screen)),
        }
    }
}
