//! # benchpad - Terminal Editor for a Format/Benchmark Service
//!
//! Write code in the terminal, send it to a remote service to be
//! reformatted or benchmarked, and see the result next to the source.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  ViewEvents  ┌──────────────────────┐  send()   ┌───────────┐
//! │    View     │◄─────────────│ SubmissionController │──────────▶│ Transport │
//! │             │              │                      │◄──────────│           │
//! │ - Terminal  │              │ - UiState            │  mpsc     │ - reqwest │
//! │ - Renderer  │              │ - one op in flight   │           │ - JSON    │
//! └─────────────┘              └──────────────────────┘           └───────────┘
//!                                         ▲
//!                                         │ Actions
//!                                         │
//!                              ┌──────────────────────┐
//!                              │    AppController     │
//!                              │ - Event loop         │
//!                              │ - Key bindings       │
//!                              └──────────────────────┘
//! ```

pub mod cmd_args;
pub mod config;
pub mod repl;

pub use repl::*;
