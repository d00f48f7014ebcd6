//! # View Events
//!
//! Events emitted by models and controllers when something on screen
//! needs refreshing. The app controller collects them and decides how
//! much to redraw.

use super::types::Pane;

/// Events emitted when view updates are needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// Full screen redraw required (terminal resize, first frame)
    FullRedrawRequired,

    /// Editor content changed (typing, formatted code written back)
    EditorRedrawRequired,

    /// Output region must be re-rendered from the current UI state
    OutputRedrawRequired,

    /// Status bar needs updating
    StatusBarUpdateRequired,

    /// Focus moved to another pane
    FocusChanged { pane: Pane },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_changed_event_should_carry_pane() {
        let event = ViewEvent::FocusChanged { pane: Pane::Editor };

        match event {
            ViewEvent::FocusChanged { pane } => assert_eq!(pane, Pane::Editor),
            _ => panic!("Expected FocusChanged event"),
        }
    }
}
