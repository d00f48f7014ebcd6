//! # Result Renderer
//!
//! Turns the current [`UiState`] into the text shown in the output pane.
//! Pure: no I/O, no mutation. Colors are left to the terminal renderer,
//! which only sees the [`Tone`].

use crate::repl::models::{FailureOrigin, Payload, UiState};

/// Confirmation used when the service formats without saying anything
pub const DEFAULT_FORMAT_NOTICE: &str = "reformatted code";

/// Visual affordance for a block of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Progress,
    Success,
    Error,
}

/// What the output pane should display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayContent {
    pub tone: Tone,
    pub heading: String,
    pub lines: Vec<String>,
}

impl DisplayContent {
    fn new(tone: Tone, heading: impl Into<String>) -> Self {
        Self {
            tone,
            heading: heading.into(),
            lines: Vec::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        self.lines.extend(split_message(text));
    }

    /// Heading and body as plain text, one entry per row
    pub fn to_lines(&self) -> Vec<String> {
        std::iter::once(self.heading.clone())
            .chain(self.lines.iter().cloned())
            .collect()
    }
}

/// Render `state` for the output pane
pub fn render(state: &UiState) -> DisplayContent {
    match state {
        UiState::Idle => {
            let mut content = DisplayContent::new(Tone::Plain, "Ready");
            content
                .lines
                .push("Format or benchmark the editor contents with the bound keys.".to_string());
            content
        }
        UiState::Pending(kind) => {
            let mut content =
                DisplayContent::new(Tone::Progress, format!("{}...", kind.progress_label()));
            content
                .lines
                .push(format!("Waiting for /{} (Esc to cancel)", kind.label()));
            content
        }
        UiState::Succeeded(success) => match &success.payload {
            Payload::FormattedCode(_) => {
                let mut content = DisplayContent::new(Tone::Success, "Formatted");
                content.push_text(success.notice.as_deref().unwrap_or(DEFAULT_FORMAT_NOTICE));
                content
            }
            Payload::BenchmarkReport(report) => {
                let mut content = DisplayContent::new(Tone::Success, "Benchmarks finished");
                content.lines.push("You entered:".to_string());
                content.lines.extend(success.source.split('\n').map(str::to_string));
                content.lines.push("The output was:".to_string());
                if !report.is_empty() {
                    content.push_text(&report.to_display_string());
                }
                if let Some(notice) = &success.notice {
                    content.push_text(notice);
                }
                content
            }
        },
        UiState::Failed(failure) => {
            let heading = match failure.origin {
                FailureOrigin::Transport => "Could not reach the service",
                FailureOrigin::Remote => "The service reported an error",
            };
            let mut content = DisplayContent::new(Tone::Error, heading);
            content.push_text(&failure.message);
            content
        }
    }
}

/// Split service text into display lines. `<br>` counts as a line break.
fn split_message(text: &str) -> Vec<String> {
    text.replace("<br/>", "\n")
        .replace("<br>", "\n")
        .lines()
        .map(str::to_string)
        .collect()
}
