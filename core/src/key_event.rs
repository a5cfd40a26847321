//! Key events fed into the composer.
//!
//! A key event carries either a printable key code, a pre-converted key
//! string (kana keypads send those), or both. Typing-correction hypotheses
//! ride along as probable key events.

/// How a pre-converted key string interacts with the input mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputStyle {
    /// Convert through the current table and mode.
    #[default]
    FollowMode,
    /// Insert the key string untouched, keeping the current mode.
    AsIs,
    /// Insert the key string untouched and fall back to the comeback mode.
    DirectInput,
}

/// An alternate key hypothesis from the touch model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbableKeyEvent {
    pub key_code: char,
    pub probability: f64,
}

#[derive(Debug, Clone, Default)]
pub struct KeyEvent {
    key_code: Option<char>,
    key_string: Option<String>,
    input_style: InputStyle,
    shift: bool,
    caps_lock: bool,
    probable_key_events: Vec<ProbableKeyEvent>,
}

impl KeyEvent {
    pub fn from_char(key_code: char) -> Self {
        Self {
            key_code: Some(key_code),
            ..Self::default()
        }
    }

    pub fn from_char_shifted(key_code: char) -> Self {
        Self {
            key_code: Some(key_code),
            shift: true,
            ..Self::default()
        }
    }

    pub fn shift_only() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }

    pub fn from_key_string(key_string: impl Into<String>, input_style: InputStyle) -> Self {
        Self {
            key_string: Some(key_string.into()),
            input_style,
            ..Self::default()
        }
    }

    pub fn from_char_and_string(key_code: char, key_string: impl Into<String>) -> Self {
        Self {
            key_code: Some(key_code),
            key_string: Some(key_string.into()),
            ..Self::default()
        }
    }

    pub fn with_caps_lock(mut self) -> Self {
        self.caps_lock = true;
        self
    }

    pub fn with_probable_key_events(mut self, events: Vec<ProbableKeyEvent>) -> Self {
        self.probable_key_events = events;
        self
    }

    pub fn key_code(&self) -> Option<char> {
        self.key_code
    }

    pub fn key_string(&self) -> Option<&str> {
        self.key_string.as_deref()
    }

    pub fn has_key_code(&self) -> bool {
        self.key_code.is_some()
    }

    pub fn has_key_string(&self) -> bool {
        self.key_string.is_some()
    }

    pub fn input_style(&self) -> InputStyle {
        self.input_style
    }

    pub fn shift(&self) -> bool {
        self.shift
    }

    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }

    pub fn probable_key_events(&self) -> &[ProbableKeyEvent] {
        &self.probable_key_events
    }

    /// A bare modifier press with nothing to insert.
    pub fn is_modifier_only(&self) -> bool {
        self.key_code.is_none() && self.key_string.is_none()
    }

    /// Whether the key code is a plain ASCII letter.
    pub fn is_alphabet(&self) -> bool {
        self.key_code.map_or(false, |c| c.is_ascii_alphabetic())
    }

    /// The character to compose with, after caps-lock inversion.
    pub fn composition_char(&self) -> Option<char> {
        let key_code = self.key_code?;
        if self.caps_lock && key_code.is_ascii_alphabetic() {
            if key_code.is_ascii_lowercase() {
                return Some(key_code.to_ascii_uppercase());
            }
            return Some(key_code.to_ascii_lowercase());
        }
        Some(key_code)
    }

    /// Uppercase letter, or a lowercase letter typed while shift is held.
    pub fn is_upper_alphabet(&self) -> bool {
        match self.composition_char() {
            Some(c) if c.is_ascii_uppercase() => true,
            Some(c) if c.is_ascii_lowercase() => self.shift,
            _ => false,
        }
    }

    /// Plain lowercase letter with no shift.
    pub fn is_lower_alphabet(&self) -> bool {
        matches!(self.composition_char(), Some(c) if c.is_ascii_lowercase()) && !self.shift
    }
}
