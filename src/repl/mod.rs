//! # REPL Components
//!
//! Models, services, controllers and views of the editor, wired together by
//! [`AppController`].

pub mod commands;
pub mod controllers;
pub mod events;
pub mod io;
pub mod models;
pub mod services;
pub mod views;

#[cfg(test)]
pub mod testing;

pub use controllers::{AppController, SubmissionController, SubmitError};
pub use events::{Pane, ViewEvent};
pub use models::{EditorAdapter, EditorModel, OperationKind, OperationResult, UiState};
pub use services::{HttpTransport, Transport};
