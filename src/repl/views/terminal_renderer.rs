//! # Terminal Renderer
//!
//! Draws the screen through a [`RenderStream`]:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  1 package main              │  editor pane (line numbers, scrolls
//! │  2                           │  to keep the cursor visible)
//! │ ── Output ────────────────── │  separator with pane title
//! │ Formatted                    │  output pane (tone-colored heading)
//! │ reformatted code             │
//! │ [default]     go | ok | 1:1  │  status bar
//! └──────────────────────────────┘
//! ```
//!
//! Rows are always padded to the full width so nothing from a previous
//! frame survives a partial redraw.

use crate::repl::events::Pane;
use crate::repl::io::RenderStream;
use crate::repl::models::{EditorModel, StatusLine};
use crate::repl::views::result_renderer::{DisplayContent, Tone};
use anyhow::Result;
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use std::io::Write;

/// Columns a tab advances to
pub const TAB_WIDTH: usize = 4;

const MIN_LINE_NUMBER_WIDTH: usize = 3;

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, Copy)]
pub struct ScreenView<'a> {
    pub editor: &'a EditorModel,
    pub output: &'a DisplayContent,
    pub status: &'a StatusLine,
    pub pane: Pane,
    /// First output line shown
    pub output_scroll: usize,
}

/// Row allocation for a terminal size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: u16,
    pub editor_top: u16,
    pub editor_height: u16,
    pub separator_row: u16,
    pub output_top: u16,
    pub output_height: u16,
    pub status_row: u16,
}

impl Layout {
    /// Editor gets three fifths of the content rows, output the rest
    pub fn for_size(width: u16, height: u16) -> Self {
        let status_row = height.saturating_sub(1);
        let content_rows = height.saturating_sub(2);
        let editor_height = (content_rows * 3 / 5).max(1).min(content_rows);
        let separator_row = editor_height;
        let output_top = separator_row.saturating_add(1).min(status_row);

        Self {
            width,
            editor_top: 0,
            editor_height,
            separator_row,
            output_top,
            output_height: content_rows - editor_height,
            status_row,
        }
    }

    /// Largest useful scroll offset for `line_count` output lines
    pub fn max_output_scroll(&self, line_count: usize) -> usize {
        line_count.saturating_sub(self.output_height as usize)
    }
}

/// Rendering operations the app controller relies on
pub trait ViewRenderer {
    /// Switch the terminal into full-screen mode
    fn initialize(&mut self) -> Result<()>;

    fn render_full(&mut self, view: &ScreenView) -> Result<()>;

    fn render_editor(&mut self, view: &ScreenView) -> Result<()>;

    /// Separator plus output pane
    fn render_output(&mut self, view: &ScreenView) -> Result<()>;

    fn render_status_bar(&mut self, view: &ScreenView) -> Result<()>;

    /// Place the cursor for the focused pane
    fn render_cursor(&mut self, view: &ScreenView) -> Result<()>;

    /// Restore the terminal
    fn cleanup(&mut self) -> Result<()>;
}

pub struct TerminalRenderer<RS: RenderStream> {
    render_stream: RS,
    terminal_size: (u16, u16),
    /// First editor line shown
    editor_scroll: usize,
}

impl<RS: RenderStream> TerminalRenderer<RS> {
    pub fn with_render_stream(render_stream: RS) -> Result<Self> {
        let terminal_size = render_stream.get_size()?;
        Ok(Self {
            render_stream,
            terminal_size,
            editor_scroll: 0,
        })
    }

    pub fn update_size(&mut self, width: u16, height: u16) {
        self.terminal_size = (width, height);
    }

    pub fn layout(&self) -> Layout {
        Layout::for_size(self.terminal_size.0, self.terminal_size.1)
    }

    pub fn editor_scroll(&self) -> usize {
        self.editor_scroll
    }

    /// Adjust the editor scroll offset so `cursor_line` is on screen
    fn scroll_editor_to(&mut self, cursor_line: usize, height: usize) {
        if height == 0 {
            return;
        }
        if cursor_line < self.editor_scroll {
            self.editor_scroll = cursor_line;
        } else if cursor_line >= self.editor_scroll + height {
            self.editor_scroll = cursor_line + 1 - height;
        }
    }

    /// Write `text` clipped and padded to exactly `width` columns
    fn write_padded(&mut self, text: &str, width: usize) -> Result<()> {
        let clipped: String = text.chars().take(width).collect();
        let padding = width.saturating_sub(clipped.chars().count());
        queue!(
            self.render_stream,
            Print(clipped),
            Print(" ".repeat(padding))
        )?;
        Ok(())
    }
}

impl<RS: RenderStream> ViewRenderer for TerminalRenderer<RS> {
    fn initialize(&mut self) -> Result<()> {
        self.render_stream.enable_raw_mode()?;
        self.render_stream.enter_alternate_screen()?;
        if !self.render_stream.enable_key_disambiguation()? {
            tracing::info!("Shift-Enter may be indistinguishable from Enter; Ctrl-R also runs benchmarks");
        }
        self.render_stream.clear_screen()?;
        self.render_stream.hide_cursor()?;
        Ok(())
    }

    fn render_full(&mut self, view: &ScreenView) -> Result<()> {
        self.render_stream.hide_cursor()?;
        self.render_stream.clear_screen()?;
        self.render_editor(view)?;
        self.render_output(view)?;
        self.render_status_bar(view)?;
        self.render_cursor(view)
    }

    fn render_editor(&mut self, view: &ScreenView) -> Result<()> {
        let layout = self.layout();
        let cursor = view.editor.cursor();
        self.scroll_editor_to(cursor.line, layout.editor_height as usize);

        let lines = view.editor.lines();
        let number_width = line_number_width(lines.len());
        let text_width = (layout.width as usize).saturating_sub(number_width + 1);

        self.render_stream.hide_cursor()?;
        for row in 0..layout.editor_height {
            let index = self.editor_scroll + row as usize;
            self.render_stream.move_cursor(0, layout.editor_top + row)?;

            match lines.get(index) {
                Some(line) => {
                    queue!(
                        self.render_stream,
                        SetAttribute(Attribute::Dim),
                        Print(format!("{:>number_width$} ", index + 1)),
                        SetAttribute(Attribute::Reset)
                    )?;
                    self.write_padded(&expand_tabs(line), text_width)?;
                }
                None => {
                    queue!(
                        self.render_stream,
                        SetForegroundColor(Color::DarkGrey),
                        Print(format!("{:<number_width$} ", "~")),
                        ResetColor
                    )?;
                    self.write_padded("", text_width)?;
                }
            }
        }

        self.render_stream.flush()?;
        Ok(())
    }

    fn render_output(&mut self, view: &ScreenView) -> Result<()> {
        let layout = self.layout();
        let width = layout.width as usize;

        self.render_stream.hide_cursor()?;
        self.render_stream.move_cursor(0, layout.separator_row)?;
        let title = "── Output ";
        let rule = "─".repeat(width.saturating_sub(title.chars().count()));
        if view.pane == Pane::Output {
            queue!(self.render_stream, SetAttribute(Attribute::Bold))?;
        } else {
            queue!(self.render_stream, SetAttribute(Attribute::Dim))?;
        }
        self.write_padded(&format!("{title}{rule}"), width)?;
        queue!(self.render_stream, SetAttribute(Attribute::Reset))?;

        let rows = view.output.to_lines();
        let color = tone_color(view.output.tone);
        for row in 0..layout.output_height {
            let index = view.output_scroll + row as usize;
            self.render_stream.move_cursor(0, layout.output_top + row)?;

            let text = rows.get(index).map(String::as_str).unwrap_or("");
            let is_heading = index == 0 && !text.is_empty();
            let colored = is_heading || view.output.tone == Tone::Error;

            if is_heading {
                queue!(self.render_stream, SetAttribute(Attribute::Bold))?;
            }
            if let (true, Some(color)) = (colored, color) {
                queue!(self.render_stream, SetForegroundColor(color))?;
            }
            self.write_padded(&expand_tabs(text), width)?;
            queue!(
                self.render_stream,
                ResetColor,
                SetAttribute(Attribute::Reset)
            )?;
        }

        self.render_stream.flush()?;
        Ok(())
    }

    fn render_status_bar(&mut self, view: &ScreenView) -> Result<()> {
        let layout = self.layout();
        let width = layout.width as usize;

        let left = match view.status.status_message() {
            Some(message) => message.to_string(),
            None => format!("[{}]", view.status.profile_name()),
        };
        let right = view.status.indicator_text();
        let gap = width
            .saturating_sub(left.chars().count())
            .saturating_sub(right.chars().count())
            .max(1);

        self.render_stream.hide_cursor()?;
        self.render_stream.move_cursor(0, layout.status_row)?;
        queue!(self.render_stream, SetAttribute(Attribute::Reverse))?;
        self.write_padded(&format!("{left}{}{right}", " ".repeat(gap)), width)?;
        queue!(self.render_stream, SetAttribute(Attribute::Reset))?;
        self.render_stream.flush()?;
        Ok(())
    }

    fn render_cursor(&mut self, view: &ScreenView) -> Result<()> {
        let layout = self.layout();
        match view.pane {
            Pane::Editor => {
                let cursor = view.editor.cursor();
                let line = view
                    .editor
                    .lines()
                    .get(cursor.line)
                    .map(String::as_str)
                    .unwrap_or("");
                let number_width = line_number_width(view.editor.line_count());
                let column = number_width + 1 + display_column(line, cursor.column);
                let row = cursor.line.saturating_sub(self.editor_scroll);

                let x = column.min(layout.width.saturating_sub(1) as usize) as u16;
                let y = layout.editor_top + (row as u16).min(layout.editor_height.saturating_sub(1));
                self.render_stream.move_cursor(x, y)?;
            }
            Pane::Output => {
                self.render_stream.move_cursor(0, layout.output_top)?;
            }
        }
        self.render_stream.show_cursor()?;
        self.render_stream.flush()?;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.render_stream.show_cursor()?;
        self.render_stream.disable_key_disambiguation()?;
        self.render_stream.leave_alternate_screen()?;
        self.render_stream.disable_raw_mode()?;
        Ok(())
    }
}

fn tone_color(tone: Tone) -> Option<Color> {
    match tone {
        Tone::Plain => None,
        Tone::Progress => Some(Color::Yellow),
        Tone::Success => Some(Color::Green),
        Tone::Error => Some(Color::Red),
    }
}

fn line_number_width(line_count: usize) -> usize {
    line_count.to_string().len().max(MIN_LINE_NUMBER_WIDTH)
}

/// Replace tabs with spaces up to the next tab stop
pub fn expand_tabs(line: &str) -> String {
    let mut expanded = String::with_capacity(line.len());
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let advance = TAB_WIDTH - column % TAB_WIDTH;
            expanded.push_str(&" ".repeat(advance));
            column += advance;
        } else {
            expanded.push(ch);
            column += 1;
        }
    }
    expanded
}

/// Screen column of character index `column` once tabs are expanded
pub fn display_column(line: &str, column: usize) -> usize {
    line.chars().take(column).fold(0, |width, ch| {
        if ch == '\t' {
            width + TAB_WIDTH - width % TAB_WIDTH
        } else {
            width + 1
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::io::MockRenderStream;
    use crate::repl::models::{Failure, UiState};
    use crate::repl::views::result_renderer::render;

    fn draw(stream: &MockRenderStream, editor: &EditorModel, state: &UiState) {
        let mut renderer = TerminalRenderer::with_render_stream(stream.clone()).unwrap();
        let output = render(state);
        let status = StatusLine::new();
        let view = ScreenView {
            editor,
            output: &output,
            status: &status,
            pane: Pane::Editor,
            output_scroll: 0,
        };
        renderer.render_full(&view).unwrap();
    }

    #[test]
    fn layout_should_split_rows_between_panes() {
        let layout = Layout::for_size(80, 24);
        assert_eq!(layout.status_row, 23);
        assert_eq!(layout.editor_height, 13);
        assert_eq!(layout.separator_row, 13);
        assert_eq!(layout.output_top, 14);
        assert_eq!(layout.output_height, 9);
        assert_eq!(layout.max_output_scroll(20), 11);
        assert_eq!(layout.max_output_scroll(3), 0);
    }

    #[test]
    fn tabs_should_expand_to_tab_stops() {
        assert_eq!(expand_tabs("\tfmt"), "    fmt");
        assert_eq!(expand_tabs("ab\tc"), "ab  c");
        assert_eq!(display_column("\tfmt", 1), 4);
        assert_eq!(display_column("\tfmt", 3), 6);
    }

    #[test]
    fn render_full_should_draw_editor_output_and_status() {
        let stream = MockRenderStream::with_size((40, 12));
        let editor = EditorModel::new("package main\n\nfunc main() {}");

        draw(&stream, &editor, &UiState::Failed(Failure::remote("syntax error")));

        assert_eq!(stream.screen_line(0).unwrap(), "  1 package main");
        assert_eq!(stream.screen_line(2).unwrap(), "  3 func main() {}");
        assert!(stream.screen_line(3).unwrap().starts_with("~"));
        assert!(stream.screen_contains("── Output"));
        assert!(stream.screen_contains("syntax error"));
        let status = stream.screen_line(11).unwrap();
        assert!(status.starts_with("[default]"));
        assert!(status.ends_with("go | idle | 1:1"));
        assert!(stream.get_buffer_string().contains("\x1b[38;5;9m"));
        assert_eq!(stream.cursor_position(), (4, 0));
    }

    #[test]
    fn editor_should_scroll_to_keep_cursor_visible() {
        let stream = MockRenderStream::with_size((40, 7));
        let text = (1..=20).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n");
        let mut editor = EditorModel::new(&text);
        for _ in 0..10 {
            editor.handle_edit_key(&crate::repl::testing::key(crossterm::event::KeyCode::Down));
        }

        let mut renderer = TerminalRenderer::with_render_stream(stream.clone()).unwrap();
        let output = render(&UiState::Idle);
        let status = StatusLine::new();
        let view = ScreenView {
            editor: &editor,
            output: &output,
            status: &status,
            pane: Pane::Editor,
            output_scroll: 0,
        };
        renderer.render_full(&view).unwrap();

        let height = renderer.layout().editor_height as usize;
        assert_eq!(renderer.editor_scroll(), 10 + 1 - height);
        assert_eq!(stream.screen_line(0).unwrap(), "  9 line 9");
        assert_eq!(stream.screen_line(2).unwrap(), " 11 line 11");
        assert_eq!(stream.cursor_position(), (4, 2));
    }
}
