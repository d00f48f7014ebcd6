//! # Status Line Model
//!
//! Encapsulates all state shown in the status bar, providing a clean
//! interface for status bar rendering.

use crate::repl::events::{LogicalPosition, Pane};

/// Status line model containing all status bar display state
#[derive(Debug, Clone)]
pub struct StatusLine {
    /// Temporary status message to display
    status_message: Option<String>,

    /// Profile name and path
    profile_name: String,
    profile_path: String,

    /// Language mode of the editor (e.g. "go")
    language: String,

    /// Current pane and cursor position
    current_pane: Pane,
    cursor_position: LogicalPosition,

    /// Short label of the submission state ("idle", "busy", ...)
    operation_label: &'static str,

    /// Duration of the last completed operation
    duration_ms: Option<u64>,
}

impl StatusLine {
    /// Create a new StatusLine with default values
    pub fn new() -> Self {
        Self {
            status_message: None,
            profile_name: "default".to_string(),
            profile_path: crate::config::DEFAULT_PROFILE_PATH.to_string(),
            language: crate::config::DEFAULT_LANGUAGE.to_string(),
            current_pane: Pane::Editor,
            cursor_position: LogicalPosition::zero(),
            operation_label: "idle",
            duration_ms: None,
        }
    }

    // === Status Message Methods ===

    /// Set a temporary status message
    pub fn set_status_message<S: Into<String>>(&mut self, message: S) {
        self.status_message = Some(message.into());
    }

    /// Clear the status message
    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }

    /// Get the current status message
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    // === Profile Methods ===

    /// Set profile information
    pub fn set_profile(&mut self, name: String, path: String) {
        self.profile_name = name;
        self.profile_path = path;
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn profile_path(&self) -> &str {
        &self.profile_path
    }

    pub fn set_language(&mut self, language: String) {
        self.language = language;
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    // === Editor State Methods ===

    pub fn set_current_pane(&mut self, pane: Pane) {
        self.current_pane = pane;
    }

    pub fn current_pane(&self) -> Pane {
        self.current_pane
    }

    pub fn set_cursor_position(&mut self, position: LogicalPosition) {
        self.cursor_position = position;
    }

    pub fn cursor_position(&self) -> LogicalPosition {
        self.cursor_position
    }

    // === Operation State Methods ===

    pub fn set_operation(&mut self, label: &'static str, duration_ms: Option<u64>) {
        self.operation_label = label;
        self.duration_ms = duration_ms;
    }

    pub fn operation_label(&self) -> &'static str {
        self.operation_label
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    /// Right-hand side of the status bar, e.g. `go | ok 152ms | 3:1`
    pub fn indicator_text(&self) -> String {
        let operation = match self.duration_ms {
            Some(ms) => format!("{} {ms}ms", self.operation_label),
            None => self.operation_label.to_string(),
        };
        format!(
            "{} | {} | {}:{}",
            self.language,
            operation,
            self.cursor_position.line + 1,
            self.cursor_position.column + 1
        )
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}
