//! # Key Bindings
//!
//! Maps key chords such as `Shift-Enter` or `Ctrl-F` to editor actions.
//! Chords can be written as strings so they can come from a profile file.

use crate::repl::models::OperationKind;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default chord for the format operation
pub const DEFAULT_FMT_KEY: &str = "Ctrl-F";

/// Default chord for the benchmark operation
pub const DEFAULT_RUN_KEY: &str = "Shift-Enter";

/// Something a key binding can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Submit(OperationKind),
    Cancel,
    SwitchPane,
    Quit,
}

/// Errors raised while parsing a key chord
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyChordError {
    #[error("empty key chord")]
    Empty,
    #[error("unknown modifier '{0}' in key chord")]
    UnknownModifier(String),
    #[error("unknown key '{0}' in key chord")]
    UnknownKey(String),
}

/// A key plus modifiers, normalized so that lookups are case-insensitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyChord {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let code = match code {
            KeyCode::Char(ch) => KeyCode::Char(ch.to_ascii_lowercase()),
            other => other,
        };
        Self { code, modifiers }
    }

    pub fn code(&self) -> KeyCode {
        self.code
    }

    pub fn modifiers(&self) -> KeyModifiers {
        self.modifiers
    }
}

impl From<KeyEvent> for KeyChord {
    fn from(event: KeyEvent) -> Self {
        Self::new(event.code, event.modifiers)
    }
}

impl FromStr for KeyChord {
    type Err = KeyChordError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        if text.is_empty() {
            return Err(KeyChordError::Empty);
        }

        // The key is whatever follows the last separator, so "Ctrl--" binds '-'
        let (prefix, key) = match text.rfind('-') {
            Some(idx) if idx + 1 < text.len() => (&text[..idx], &text[idx + 1..]),
            Some(idx) if idx > 0 => match text[..idx].strip_suffix('-') {
                Some(prefix) => (prefix, "-"),
                None => return Err(KeyChordError::UnknownKey(text.to_string())),
            },
            _ => ("", text),
        };

        let mut modifiers = KeyModifiers::NONE;
        for part in prefix.split('-').filter(|p| !p.is_empty()) {
            modifiers |= match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" | "c" => KeyModifiers::CONTROL,
                "shift" | "s" => KeyModifiers::SHIFT,
                "alt" | "meta" | "m" => KeyModifiers::ALT,
                _ => return Err(KeyChordError::UnknownModifier(part.to_string())),
            };
        }

        let code = match key.to_ascii_lowercase().as_str() {
            "enter" | "return" => KeyCode::Enter,
            "esc" | "escape" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "backspace" => KeyCode::Backspace,
            "space" => KeyCode::Char(' '),
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            lower => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => KeyCode::Char(ch),
                    _ => match lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                        Some(n) if (1..=12).contains(&n) => KeyCode::F(n),
                        _ => return Err(KeyChordError::UnknownKey(key.to_string())),
                    },
                }
            }
        };

        Ok(Self::new(code, modifiers))
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("Ctrl-")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("Alt-")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("Shift-")?;
        }
        match self.code {
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(ch) => write!(f, "{}", ch.to_ascii_uppercase()),
            KeyCode::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Registry of key chords and the actions they trigger
#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    bindings: HashMap<KeyChord, Action>,
}

impl KeyBindings {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the default bindings, using the given chords
    /// for the two submit actions
    pub fn with_defaults(fmt_key: KeyChord, run_key: KeyChord) -> Self {
        let mut bindings = Self::new();
        bindings.register(fmt_key, Action::Submit(OperationKind::Format));
        bindings.register(run_key, Action::Submit(OperationKind::Benchmark));
        bindings.register(
            KeyChord::new(KeyCode::Char('r'), KeyModifiers::CONTROL),
            Action::Submit(OperationKind::Benchmark),
        );
        bindings.register(KeyChord::new(KeyCode::Esc, KeyModifiers::NONE), Action::Cancel);
        bindings.register(
            KeyChord::new(KeyCode::Char('w'), KeyModifiers::CONTROL),
            Action::SwitchPane,
        );
        bindings.register(
            KeyChord::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Action::Quit,
        );
        bindings.register(
            KeyChord::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
            Action::Quit,
        );
        bindings
    }

    /// Bind a chord, replacing any earlier binding for the same chord
    pub fn register(&mut self, chord: KeyChord, action: Action) -> Option<Action> {
        tracing::debug!("Binding {} to {:?}", chord, action);
        self.bindings.insert(chord, action)
    }

    /// Look up the action bound to a key event
    pub fn lookup(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings.get(&KeyChord::from(*event)).copied()
    }

    /// First chord bound to an action, for hints
    pub fn chord_for(&self, action: Action) -> Option<KeyChord> {
        let mut chords: Vec<KeyChord> = self
            .bindings
            .iter()
            .filter(|(_, bound)| **bound == action)
            .map(|(chord, _)| *chord)
            .collect();
        chords.sort_by_key(|chord| chord.to_string());
        chords.into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
