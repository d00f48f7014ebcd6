//! # Commands
//!
//! Key chords and the actions they are bound to.

pub mod keymap;

pub use keymap::{Action, KeyBindings, KeyChord, KeyChordError};
