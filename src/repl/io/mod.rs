//! # I/O Abstraction Layer
//!
//! Input and output streams behind traits so the app controller can run
//! against a real terminal or a scripted one.
//!
//! ```text
//! Production:  AppController ──▶ TerminalEventStream  ──▶ crossterm::event::read()
//!                            ──▶ TerminalRenderStream ──▶ crossterm::execute!()
//!
//! Testing:     AppController ──▶ MockEventStream      ──▶ VecDeque<Event>
//!                            ──▶ MockRenderStream     ──▶ Vec<RenderCommand>
//! ```

use anyhow::Result;
use crossterm::event::Event;
use std::io::Write;
use std::time::Duration;

pub mod mock;
pub mod terminal;

pub use mock::{MockEventStream, MockRenderStream, RenderCommand};
pub use terminal::{TerminalEventStream, TerminalRenderStream};

/// Terminal size as (width, height)
pub type TerminalSize = (u16, u16);

/// Source of input events
pub trait EventStream: Send {
    /// True if an event can be read within `timeout`
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    /// Read the next event. Only call after `poll` returned true.
    fn read(&mut self) -> Result<Event>;
}

/// Sink for rendered output plus the terminal mode switches around it
pub trait RenderStream: Write + Send {
    fn clear_screen(&mut self) -> Result<()>;

    /// Move cursor to (column, row)
    fn move_cursor(&mut self, x: u16, y: u16) -> Result<()>;

    fn hide_cursor(&mut self) -> Result<()>;

    fn show_cursor(&mut self) -> Result<()>;

    fn get_size(&self) -> Result<TerminalSize>;

    fn enter_alternate_screen(&mut self) -> Result<()>;

    fn leave_alternate_screen(&mut self) -> Result<()>;

    fn enable_raw_mode(&mut self) -> Result<()>;

    fn disable_raw_mode(&mut self) -> Result<()>;

    /// Ask the terminal to report modified keys such as Shift-Enter.
    /// Returns false when the terminal cannot.
    fn enable_key_disambiguation(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn disable_key_disambiguation(&mut self) -> Result<()> {
        Ok(())
    }
}
