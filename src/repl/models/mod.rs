//! # Models
//!
//! Plain state: the editor buffer, the operation/result types and the
//! UI state machine the output region is drawn from.

pub mod editor_model;
pub mod operation;
pub mod status_line;
pub mod ui_state;

pub use editor_model::{EditorAdapter, EditorModel, DEFAULT_SOURCE};
pub use operation::{
    BenchmarkReport, Failure, FailureOrigin, OperationKind, OperationResult, Payload,
};
pub use status_line::StatusLine;
pub use ui_state::{SuccessReport, UiState};
