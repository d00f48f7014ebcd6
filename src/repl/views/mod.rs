//! # Views Module
//!
//! Turning state into pixels: the pure output renderer and the terminal
//! renderer that draws the whole screen.

pub mod result_renderer;
pub mod terminal_renderer;

pub use result_renderer::{render, DisplayContent, Tone};
pub use terminal_renderer::{Layout, ScreenView, TerminalRenderer, ViewRenderer};
