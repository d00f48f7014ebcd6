//! # Core Event Types
//!
//! Common types used throughout the event system: cursor positions and panes.

/// Logical position in text content (line and column, both in characters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPosition {
    pub line: usize,
    pub column: usize,
}

impl LogicalPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }
}

/// Which pane currently has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    /// The code editor
    Editor,
    /// The read-only output region
    Output,
}

impl Pane {
    /// The other pane
    pub fn toggled(self) -> Self {
        match self {
            Pane::Editor => Pane::Output,
            Pane::Output => Pane::Editor,
        }
    }
}
