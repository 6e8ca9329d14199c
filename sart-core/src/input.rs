use serde::{Deserialize, Serialize};

/// Keys the task listens for. Everything else is dropped by the input pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Space,
    Escape,
    /// Number row or keypad digit, 0-9.
    Number(u8),
}

impl Key {
    /// Rating keys accepted by the probe screens.
    pub const RATINGS: [Key; 6] = [
        Key::Number(1),
        Key::Number(2),
        Key::Number(3),
        Key::Number(4),
        Key::Number(5),
        Key::Number(6),
    ];

    /// Label written to the data file, matching the key names of the keyboard layer.
    pub fn label(&self) -> String {
        match self {
            Key::Space => "space".to_string(),
            Key::Escape => "escape".to_string(),
            Key::Number(n) => n.to_string(),
        }
    }
}

/// A key press stamped on the session clock (nanoseconds since clock start).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub timestamp_ns: u64,
}

impl KeyPress {
    pub fn new(key: Key, timestamp_ns: u64) -> Self {
        Self { key, timestamp_ns }
    }
}
