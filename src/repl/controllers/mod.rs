//! # Controllers Module
//!
//! The submission state machine and the application controller that
//! drives it from the event loop.

pub mod app_controller;
pub mod submission;

pub use app_controller::AppController;
pub use submission::{Completion, SubmissionController, SubmitError, Ticket};
