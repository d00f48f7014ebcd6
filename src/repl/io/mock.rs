//! # Mock I/O Implementations for Testing
//!
//! Scripted input and a recording output stream. The render stream keeps a
//! character grid of what would be on screen so tests can assert on rows
//! instead of raw escape sequences.

use super::{EventStream, RenderStream, TerminalSize};
use anyhow::Result;
use crossterm::event::Event;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Event stream fed from a queue
#[derive(Debug, Default)]
pub struct MockEventStream {
    events: VecDeque<Event>,
}

impl MockEventStream {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventStream for MockEventStream {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(!self.events.is_empty())
    }

    fn read(&mut self) -> Result<Event> {
        self.events
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("No events available"))
    }
}

/// Recorded render command for verification
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    ClearScreen,
    MoveCursor(u16, u16),
    HideCursor,
    ShowCursor,
    EnterAlternateScreen,
    LeaveAlternateScreen,
    EnableRawMode,
    DisableRawMode,
    Write(Vec<u8>),
    Flush,
}

#[derive(Debug)]
struct MockTerminal {
    commands: Vec<RenderCommand>,
    grid: Vec<Vec<char>>,
    size: TerminalSize,
    cursor: (u16, u16),
    cursor_visible: bool,
    raw_mode: bool,
    alternate_screen: bool,
    /// Bytes of an escape sequence split across writes
    pending_escape: Vec<u8>,
}

impl MockTerminal {
    fn new(size: TerminalSize) -> Self {
        Self {
            commands: Vec::new(),
            grid: blank_grid(size),
            size,
            cursor: (0, 0),
            cursor_visible: true,
            raw_mode: false,
            alternate_screen: false,
            pending_escape: Vec::new(),
        }
    }

    fn put_text(&mut self, buf: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending_escape);
        bytes.extend_from_slice(buf);

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '\x1b' {
                // Styling escapes carry no text; skip to the CSI final byte
                let mut sequence = String::from(ch);
                let mut complete = false;
                for next in chars.by_ref() {
                    sequence.push(next);
                    if sequence.len() > 2 && ('\x40'..='\x7e').contains(&next) {
                        complete = true;
                        break;
                    }
                }
                if !complete {
                    self.pending_escape = sequence.into_bytes();
                }
                continue;
            }
            self.put_char(ch);
        }
    }

    fn put_char(&mut self, ch: char) {
        let (x, y) = self.cursor;
        match ch {
            '\r' => self.cursor.0 = 0,
            '\n' => self.cursor = (0, y.saturating_add(1)),
            _ => {
                if let Some(cell) = self
                    .grid
                    .get_mut(y as usize)
                    .and_then(|row| row.get_mut(x as usize))
                {
                    *cell = ch;
                }
                self.cursor.0 = x.saturating_add(1);
            }
        }
    }
}

fn blank_grid((width, height): TerminalSize) -> Vec<Vec<char>> {
    vec![vec![' '; width as usize]; height as usize]
}

/// Render stream that records commands and maintains a screen grid.
///
/// Clones share state, so a test can keep one while the controller owns
/// the other.
#[derive(Debug, Clone)]
pub struct MockRenderStream {
    terminal: Arc<Mutex<MockTerminal>>,
}

impl MockRenderStream {
    pub fn new() -> Self {
        Self::with_size((80, 24))
    }

    pub fn with_size(size: TerminalSize) -> Self {
        Self {
            terminal: Arc::new(Mutex::new(MockTerminal::new(size))),
        }
    }

    /// Change the reported size, as a terminal resize would
    pub fn set_size(&self, size: TerminalSize) {
        let mut terminal = self.lock();
        terminal.size = size;
        terminal.grid = blank_grid(size);
    }

    pub fn get_commands(&self) -> Vec<RenderCommand> {
        self.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    pub fn has_command(&self, command: &RenderCommand) -> bool {
        self.lock().commands.contains(command)
    }

    /// Everything written so far, escape sequences included
    pub fn get_buffer_string(&self) -> String {
        let terminal = self.lock();
        let bytes: Vec<u8> = terminal
            .commands
            .iter()
            .filter_map(|command| match command {
                RenderCommand::Write(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Screen rows with trailing blanks trimmed
    pub fn screen_lines(&self) -> Vec<String> {
        self.lock()
            .grid
            .iter()
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect()
    }

    pub fn screen_line(&self, row: usize) -> Option<String> {
        self.screen_lines().into_iter().nth(row)
    }

    pub fn screen_contains(&self, text: &str) -> bool {
        self.screen_lines().iter().any(|line| line.contains(text))
    }

    /// Row of the first screen line containing `text`
    pub fn find_row(&self, text: &str) -> Option<usize> {
        self.screen_lines().iter().position(|line| line.contains(text))
    }

    pub fn cursor_position(&self) -> (u16, u16) {
        self.lock().cursor
    }

    pub fn is_cursor_visible(&self) -> bool {
        self.lock().cursor_visible
    }

    pub fn is_raw_mode(&self) -> bool {
        self.lock().raw_mode
    }

    pub fn is_alternate_screen(&self) -> bool {
        self.lock().alternate_screen
    }

    fn lock(&self) -> MutexGuard<'_, MockTerminal> {
        // A test that panicked mid-render still leaves a readable grid
        self.terminal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, command: RenderCommand) {
        self.lock().commands.push(command);
    }
}

impl Write for MockRenderStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut terminal = self.lock();
        terminal.commands.push(RenderCommand::Write(buf.to_vec()));
        terminal.put_text(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.record(RenderCommand::Flush);
        Ok(())
    }
}

impl RenderStream for MockRenderStream {
    fn clear_screen(&mut self) -> Result<()> {
        let mut terminal = self.lock();
        terminal.commands.push(RenderCommand::ClearScreen);
        terminal.grid = blank_grid(terminal.size);
        Ok(())
    }

    fn move_cursor(&mut self, x: u16, y: u16) -> Result<()> {
        let mut terminal = self.lock();
        terminal.commands.push(RenderCommand::MoveCursor(x, y));
        terminal.cursor = (x, y);
        Ok(())
    }

    fn hide_cursor(&mut self) -> Result<()> {
        let mut terminal = self.lock();
        terminal.commands.push(RenderCommand::HideCursor);
        terminal.cursor_visible = false;
        Ok(())
    }

    fn show_cursor(&mut self) -> Result<()> {
        let mut terminal = self.lock();
        terminal.commands.push(RenderCommand::ShowCursor);
        terminal.cursor_visible = true;
        Ok(())
    }

    fn get_size(&self) -> Result<TerminalSize> {
        Ok(self.lock().size)
    }

    fn enter_alternate_screen(&mut self) -> Result<()> {
        let mut terminal = self.lock();
        terminal.commands.push(RenderCommand::EnterAlternateScreen);
        terminal.alternate_screen = true;
        Ok(())
    }

    fn leave_alternate_screen(&mut self) -> Result<()> {
        let mut terminal = self.lock();
        terminal.commands.push(RenderCommand::LeaveAlternateScreen);
        terminal.alternate_screen = false;
        Ok(())
    }

    fn enable_raw_mode(&mut self) -> Result<()> {
        let mut terminal = self.lock();
        terminal.commands.push(RenderCommand::EnableRawMode);
        terminal.raw_mode = true;
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        let mut terminal = self.lock();
        terminal.commands.push(RenderCommand::DisableRawMode);
        terminal.raw_mode = false;
        Ok(())
    }
}

impl Default for MockRenderStream {
    fn default() -> Self {
        Self::new()
    }
}
