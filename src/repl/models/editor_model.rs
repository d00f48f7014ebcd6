//! # Editor Model
//!
//! The editing widget as the rest of the app sees it. [`EditorAdapter`] is
//! the narrow contract the submission controller depends on; [`EditorModel`]
//! is the terminal implementation: a line buffer with a cursor, a handful of
//! editing keys and its own key binding registry.

use crate::repl::commands::keymap::{Action, KeyBindings, KeyChord};
use crate::repl::events::LogicalPosition;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Source shown when the editor starts without a file
pub const DEFAULT_SOURCE: &str = r#"package main

import "fmt"

func main() {
	fmt.Println("hello")
}
"#;

/// Contract between the submission controller and the editing widget
pub trait EditorAdapter {
    /// Current content
    fn get_value(&self) -> String;

    /// Replace the whole content
    fn set_value(&mut self, text: &str);

    /// Bind a key chord to an action while the editor has focus
    fn register_key_binding(&mut self, chord: KeyChord, action: Action);

    /// Action bound to a key event, if any
    fn action_for(&self, event: &KeyEvent) -> Option<Action>;

    /// Give the editor input focus
    fn focus(&mut self);

    fn is_focused(&self) -> bool;
}

/// Terminal line editor
#[derive(Debug, Clone)]
pub struct EditorModel {
    lines: Vec<String>,
    cursor: LogicalPosition,
    focused: bool,
    bindings: KeyBindings,
    /// Incremented on every content change
    revision: u64,
}

impl EditorModel {
    /// Create an editor holding `text`, with no key bindings
    pub fn new(text: &str) -> Self {
        Self {
            lines: split_lines(text),
            cursor: LogicalPosition::zero(),
            focused: true,
            bindings: KeyBindings::new(),
            revision: 0,
        }
    }

    pub fn with_bindings(text: &str, bindings: KeyBindings) -> Self {
        Self {
            bindings,
            ..Self::new(text)
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn cursor(&self) -> LogicalPosition {
        self.cursor
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Drop focus, e.g. when the output pane is selected
    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Apply an editing key. Returns true if the content changed.
    pub fn handle_edit_key(&mut self, event: &KeyEvent) -> bool {
        let control = event
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);

        match event.code {
            KeyCode::Char(ch) if !control => {
                self.insert_char(ch);
                true
            }
            KeyCode::Enter if event.modifiers.is_empty() => {
                self.insert_newline();
                true
            }
            // Tabs are kept as tabs; gofmt expects them
            KeyCode::Tab => {
                self.insert_char('\t');
                true
            }
            KeyCode::Backspace => self.delete_before_cursor(),
            KeyCode::Delete => self.delete_at_cursor(),
            KeyCode::Left => {
                self.move_left();
                false
            }
            KeyCode::Right => {
                self.move_right();
                false
            }
            KeyCode::Up => {
                self.move_vertically(-1);
                false
            }
            KeyCode::Down => {
                self.move_vertically(1);
                false
            }
            KeyCode::Home => {
                self.cursor.column = 0;
                false
            }
            KeyCode::End => {
                self.cursor.column = self.current_line_len();
                false
            }
            _ => false,
        }
    }

    fn current_line_len(&self) -> usize {
        self.lines[self.cursor.line].chars().count()
    }

    fn byte_offset(&self, line: usize, column: usize) -> usize {
        self.lines[line]
            .char_indices()
            .nth(column)
            .map(|(idx, _)| idx)
            .unwrap_or(self.lines[line].len())
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn insert_char(&mut self, ch: char) {
        let offset = self.byte_offset(self.cursor.line, self.cursor.column);
        self.lines[self.cursor.line].insert(offset, ch);
        self.cursor.column += 1;
        self.touch();
    }

    fn insert_newline(&mut self) {
        let offset = self.byte_offset(self.cursor.line, self.cursor.column);
        let rest = self.lines[self.cursor.line].split_off(offset);
        self.lines.insert(self.cursor.line + 1, rest);
        self.cursor = LogicalPosition::new(self.cursor.line + 1, 0);
        self.touch();
    }

    fn delete_before_cursor(&mut self) -> bool {
        if self.cursor.column > 0 {
            let offset = self.byte_offset(self.cursor.line, self.cursor.column - 1);
            self.lines[self.cursor.line].remove(offset);
            self.cursor.column -= 1;
        } else if self.cursor.line > 0 {
            let removed = self.lines.remove(self.cursor.line);
            self.cursor.line -= 1;
            self.cursor.column = self.current_line_len();
            self.lines[self.cursor.line].push_str(&removed);
        } else {
            return false;
        }
        self.touch();
        true
    }

    fn delete_at_cursor(&mut self) -> bool {
        if self.cursor.column < self.current_line_len() {
            let offset = self.byte_offset(self.cursor.line, self.cursor.column);
            self.lines[self.cursor.line].remove(offset);
        } else if self.cursor.line + 1 < self.lines.len() {
            let next = self.lines.remove(self.cursor.line + 1);
            self.lines[self.cursor.line].push_str(&next);
        } else {
            return false;
        }
        self.touch();
        true
    }

    fn move_left(&mut self) {
        if self.cursor.column > 0 {
            self.cursor.column -= 1;
        } else if self.cursor.line > 0 {
            self.cursor.line -= 1;
            self.cursor.column = self.current_line_len();
        }
    }

    fn move_right(&mut self) {
        if self.cursor.column < self.current_line_len() {
            self.cursor.column += 1;
        } else if self.cursor.line + 1 < self.lines.len() {
            self.cursor = LogicalPosition::new(self.cursor.line + 1, 0);
        }
    }

    fn move_vertically(&mut self, delta: isize) {
        let target = self.cursor.line as isize + delta;
        if target < 0 || target as usize >= self.lines.len() {
            return;
        }
        self.cursor.line = target as usize;
        self.cursor.column = self.cursor.column.min(self.current_line_len());
    }
}

impl Default for EditorModel {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE)
    }
}

impl EditorAdapter for EditorModel {
    fn get_value(&self) -> String {
        self.lines.join("\n")
    }

    fn set_value(&mut self, text: &str) {
        self.lines = split_lines(text);
        // Keep the cursor where it was, clamped to the new content
        self.cursor.line = self.cursor.line.min(self.lines.len() - 1);
        self.cursor.column = self.cursor.column.min(self.current_line_len());
        self.touch();
        tracing::debug!("Editor content replaced ({} lines)", self.lines.len());
    }

    fn register_key_binding(&mut self, chord: KeyChord, action: Action) {
        self.bindings.register(chord, action);
    }

    fn action_for(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings.lookup(event)
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn is_focused(&self) -> bool {
        self.focused
    }
}

/// Split on '\n' so that joining with '\n' gives back the exact input
fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}
