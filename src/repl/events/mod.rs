//! # Events Module
//!
//! Positions, panes and the view events that drive selective redraws.

pub mod types;
pub mod view_events;

pub use types::{LogicalPosition, Pane};
pub use view_events::ViewEvent;
