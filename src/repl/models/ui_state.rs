//! # UI State
//!
//! What the output region is currently showing. Owned by the submission
//! controller and only changed by user actions or transport completion.

use super::operation::{Failure, OperationKind, Payload};

/// A completed, successful operation together with what was submitted
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessReport {
    /// Source text as it was when the operation started
    pub source: String,
    pub payload: Payload,
    pub notice: Option<String>,
}

/// State machine driving the output region
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UiState {
    #[default]
    Idle,
    Pending(OperationKind),
    Succeeded(SuccessReport),
    Failed(Failure),
}

impl UiState {
    pub fn is_pending(&self) -> bool {
        matches!(self, UiState::Pending(_))
    }

    /// Kind of the operation in flight, if any
    pub fn pending_kind(&self) -> Option<OperationKind> {
        match self {
            UiState::Pending(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Short label for the status bar
    pub fn label(&self) -> &'static str {
        match self {
            UiState::Idle => "idle",
            UiState::Pending(_) => "busy",
            UiState::Succeeded(_) => "ok",
            UiState::Failed(_) => "error",
        }
    }
}
