//! # Application Controller
//!
//! Owns the event loop. Key events are mapped to actions through the
//! editor's bindings; submit actions go to the [`SubmissionController`],
//! everything else edits the buffer or moves around. Results from the
//! background transport task are applied between events, and the view
//! events they produce decide what gets redrawn.

use crate::repl::{
    commands::keymap::{Action, KeyBindings},
    controllers::submission::{Completion, SubmissionController},
    events::{Pane, ViewEvent},
    io::{EventStream, RenderStream},
    models::{EditorAdapter, EditorModel, OperationKind, StatusLine, UiState, DEFAULT_SOURCE},
    services::{HttpTransport, Transport},
    views::{render, ScreenView, TerminalRenderer, ViewRenderer},
};
use crate::{
    cmd_args::CommandLineArgs,
    config::{self, ProfileStore, ServiceProfile},
};
use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct AppController<ES: EventStream, RS: RenderStream> {
    submission: SubmissionController<EditorModel>,
    view_renderer: TerminalRenderer<RS>,
    event_stream: ES,
    status_line: StatusLine,
    key_hint: String,
    pane: Pane,
    output_scroll: usize,
    pending_view_events: Vec<ViewEvent>,
    should_quit: bool,
}

impl<ES: EventStream, RS: RenderStream> AppController<ES, RS> {
    /// Create the controller from command line arguments and the profile file
    pub fn with_io_streams(
        cmd_args: CommandLineArgs,
        event_stream: ES,
        render_stream: RS,
    ) -> Result<Self> {
        let profile_name = cmd_args.profile();
        let profile_path = config::get_profile_path();
        let mut profile = Self::load_profile(profile_name, &profile_path)?;
        if let Some(server) = cmd_args.server() {
            profile = profile.with_server(server)?;
        }

        let source = match cmd_args.file() {
            Some(path) => Self::load_source(path)?,
            None => DEFAULT_SOURCE.to_string(),
        };

        let transport = HttpTransport::new(&profile)?;
        tracing::info!("Using service at {}", transport.server());

        let mut controller = Self::with_transport(
            &profile,
            &source,
            Arc::new(transport),
            event_stream,
            render_stream,
        )?;
        controller
            .status_line
            .set_profile(profile_name.to_string(), profile_path);
        Ok(controller)
    }

    /// Create the controller around an explicit profile and transport
    pub fn with_transport(
        profile: &ServiceProfile,
        source: &str,
        transport: Arc<dyn Transport>,
        event_stream: ES,
        render_stream: RS,
    ) -> Result<Self> {
        let bindings = KeyBindings::with_defaults(profile.fmt_key(), profile.run_key());
        let editor = EditorModel::with_bindings(source, bindings);

        let view_renderer = TerminalRenderer::with_render_stream(render_stream)?;

        let mut status_line = StatusLine::new();
        status_line.set_language(profile.language().to_string());
        let key_hint = Self::key_hint(editor.bindings());
        status_line.set_status_message(key_hint.clone());

        Ok(Self {
            submission: SubmissionController::new(editor, transport),
            view_renderer,
            event_stream,
            status_line,
            key_hint,
            pane: Pane::Editor,
            output_scroll: 0,
            pending_view_events: Vec::new(),
            should_quit: false,
        })
    }

    /// Load profile from the INI file, or the defaults if it is not there
    fn load_profile(profile_name: &str, profile_path: &str) -> Result<ServiceProfile> {
        tracing::debug!("Loading profile '{}' from '{}'", profile_name, profile_path);

        let store = ProfileStore::new(profile_path);
        match store.get_profile(profile_name)? {
            Some(profile) => {
                tracing::debug!("Profile loaded successfully, server: {}", profile.server());
                Ok(profile)
            }
            None => {
                tracing::debug!("Profile '{}' not found, using defaults", profile_name);
                Ok(ServiceProfile::default())
            }
        }
    }

    fn load_source(path: &Path) -> Result<String> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read source file '{}'", path.display()))?;
        Ok(text.replace("\r\n", "\n"))
    }

    fn key_hint(bindings: &KeyBindings) -> String {
        let chord = |action| {
            bindings
                .chord_for(action)
                .map(|chord| chord.to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        format!(
            "{} format | {} run | {} cancel | {} quit",
            chord(Action::Submit(OperationKind::Format)),
            chord(Action::Submit(OperationKind::Benchmark)),
            chord(Action::Cancel),
            chord(Action::Quit)
        )
    }
}

impl<ES: EventStream, RS: RenderStream> AppController<ES, RS> {
    /// Run the main application loop
    pub async fn run(&mut self) -> Result<()> {
        self.view_renderer.initialize()?;
        self.emit_view_event([ViewEvent::FullRedrawRequired]);
        self.process_view_events()?;

        let result = self.event_loop().await;

        // Restore the terminal even if the loop failed
        self.submission.cancel();
        self.view_renderer.cleanup()?;
        result
    }

    async fn event_loop(&mut self) -> Result<()> {
        while !self.should_quit {
            if self.event_stream.poll(POLL_INTERVAL)? {
                match self.event_stream.read()? {
                    Event::Key(key_event) => self.process_key_event(key_event)?,
                    Event::Resize(width, height) => {
                        self.view_renderer.update_size(width, height);
                        self.emit_view_event([ViewEvent::FullRedrawRequired]);
                    }
                    _ => {}
                }
            } else {
                // Let the transport task make progress
                tokio::task::yield_now().await;
            }

            if let Some(completion) = self.submission.poll_completion() {
                self.on_completion(completion);
            }
            if !self.should_quit {
                self.process_view_events()?;
            }
        }
        Ok(())
    }

    /// Handle one key event and redraw what it changed
    pub fn process_key_event(&mut self, key_event: KeyEvent) -> Result<()> {
        if key_event.kind != KeyEventKind::Press {
            return Ok(());
        }
        tracing::debug!("Received key event: {:?}", key_event);

        match self.submission.editor().action_for(&key_event) {
            Some(action) => self.apply_action(action),
            None => match self.pane {
                Pane::Editor => self.edit(&key_event),
                Pane::Output => self.scroll_output(&key_event),
            },
        }

        if !self.should_quit {
            self.process_view_events()?;
        }
        Ok(())
    }

    fn apply_action(&mut self, action: Action) {
        tracing::debug!("Action: {:?}", action);
        match action {
            Action::Submit(kind) => match self.submission.dispatch(kind) {
                Ok(_) => {
                    self.output_scroll = 0;
                    self.status_line.clear_status_message();
                }
                Err(error) => {
                    self.status_line.set_status_message(error.to_string());
                    self.emit_view_event([ViewEvent::StatusBarUpdateRequired]);
                }
            },
            Action::Cancel => {
                if self.submission.cancel() {
                    self.status_line.set_status_message("Cancelled");
                }
            }
            Action::SwitchPane => {
                self.pane = self.pane.toggled();
                match self.pane {
                    Pane::Editor => self.submission.editor_mut().focus(),
                    Pane::Output => self.submission.editor_mut().blur(),
                }
                self.emit_view_event([
                    ViewEvent::FocusChanged { pane: self.pane },
                    ViewEvent::OutputRedrawRequired,
                    ViewEvent::StatusBarUpdateRequired,
                ]);
            }
            Action::Quit => {
                self.should_quit = true;
            }
        }
    }

    fn edit(&mut self, key_event: &KeyEvent) {
        let changed = self.submission.editor_mut().handle_edit_key(key_event);

        // A format result computed from older text must not replace the edit
        if changed && self.submission.state().pending_kind() == Some(OperationKind::Format) {
            self.submission.cancel();
            self.status_line
                .set_status_message("Format cancelled: buffer changed");
        }

        self.emit_view_event([
            ViewEvent::EditorRedrawRequired,
            ViewEvent::StatusBarUpdateRequired,
        ]);
    }

    fn scroll_output(&mut self, key_event: &KeyEvent) {
        let page = self.view_renderer.layout().output_height.max(1) as usize;
        let max_scroll = self
            .view_renderer
            .layout()
            .max_output_scroll(render(self.submission.state()).to_lines().len());

        self.output_scroll = match key_event.code {
            KeyCode::Up => self.output_scroll.saturating_sub(1),
            KeyCode::Down => self.output_scroll + 1,
            KeyCode::PageUp => self.output_scroll.saturating_sub(page),
            KeyCode::PageDown => self.output_scroll + page,
            KeyCode::Home => 0,
            KeyCode::End => max_scroll,
            _ => return,
        }
        .min(max_scroll);

        self.emit_view_event([ViewEvent::OutputRedrawRequired]);
    }

    fn on_completion(&mut self, completion: Completion) {
        if let Completion::Applied(kind) = completion {
            tracing::debug!("Applied {} result", kind);
            self.output_scroll = 0;
            self.status_line.set_status_message(self.key_hint.clone());
            // Focus follows the editor after a format
            if self.submission.editor().is_focused() {
                self.pane = Pane::Editor;
            }
        }
    }

    /// Wait for the operation in flight, apply it and redraw
    pub async fn wait_for_completion(&mut self) -> Result<Option<Completion>> {
        let completion = self.submission.next_completion().await;
        if let Some(completion) = completion {
            self.on_completion(completion);
        }
        self.process_view_events()?;
        Ok(completion)
    }

    fn emit_view_event(&mut self, events: impl IntoIterator<Item = ViewEvent>) {
        self.pending_view_events.extend(events);
    }

    fn sync_status_line(&mut self) {
        let state = self.submission.state();
        let duration_ms = match state {
            UiState::Succeeded(_) | UiState::Failed(_) => self.submission.last_duration_ms(),
            UiState::Idle | UiState::Pending(_) => None,
        };
        self.status_line.set_operation(state.label(), duration_ms);
        self.status_line
            .set_cursor_position(self.submission.editor().cursor());
        self.status_line.set_current_pane(self.pane);
    }

    /// Redraw the regions named by pending view events
    fn process_view_events(&mut self) -> Result<()> {
        let mut view_events = std::mem::take(&mut self.pending_view_events);
        view_events.extend(self.submission.collect_pending_view_events());
        if view_events.is_empty() {
            return Ok(());
        }

        let mut needs_full_redraw = false;
        let mut needs_editor = false;
        let mut needs_output = false;
        let mut needs_status_bar = false;

        for event in view_events {
            match event {
                ViewEvent::FullRedrawRequired => {
                    needs_full_redraw = true;
                    break;
                }
                ViewEvent::EditorRedrawRequired => needs_editor = true,
                ViewEvent::OutputRedrawRequired => needs_output = true,
                ViewEvent::StatusBarUpdateRequired => needs_status_bar = true,
                ViewEvent::FocusChanged { pane } => {
                    self.pane = pane;
                    needs_output = true;
                    needs_status_bar = true;
                }
            }
        }

        self.sync_status_line();

        let output = render(self.submission.state());
        let max_scroll = self
            .view_renderer
            .layout()
            .max_output_scroll(output.to_lines().len());
        self.output_scroll = self.output_scroll.min(max_scroll);

        let view = ScreenView {
            editor: self.submission.editor(),
            output: &output,
            status: &self.status_line,
            pane: self.pane,
            output_scroll: self.output_scroll,
        };

        if needs_full_redraw {
            return self.view_renderer.render_full(&view);
        }
        if needs_editor {
            self.view_renderer.render_editor(&view)?;
        }
        if needs_output {
            self.view_renderer.render_output(&view)?;
        }
        if needs_status_bar {
            self.view_renderer.render_status_bar(&view)?;
        }
        self.view_renderer.render_cursor(&view)
    }

    pub fn submission(&self) -> &SubmissionController<EditorModel> {
        &self.submission
    }

    pub fn status_line(&self) -> &StatusLine {
        &self.status_line
    }

    pub fn current_pane(&self) -> Pane {
        self.pane
    }

    pub fn output_scroll(&self) -> usize {
        self.output_scroll
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::io::{MockEventStream, MockRenderStream, RenderCommand};
    use crate::repl::models::{BenchmarkReport, Failure, OperationResult};
    use crate::repl::testing::{ctrl, key, ScriptedTransport, StalledTransport};
    use crossterm::event::KeyModifiers;

    type TestController = AppController<MockEventStream, MockRenderStream>;

    fn controller_with(
        source: &str,
        transport: Arc<dyn Transport>,
        events: Vec<Event>,
    ) -> (TestController, MockRenderStream) {
        let screen = MockRenderStream::with_size((60, 20));
        let controller = AppController::with_transport(
            &ServiceProfile::default(),
            source,
            transport,
            MockEventStream::new(events),
            screen.clone(),
        )
        .unwrap();
        (controller, screen)
    }

    #[test]
    fn controller_should_start_idle_with_key_hint() {
        let (controller, _) = controller_with(DEFAULT_SOURCE, Arc::new(StalledTransport), vec![]);

        assert_eq!(controller.submission().state(), &UiState::Idle);
        assert_eq!(controller.submission().editor().get_value(), DEFAULT_SOURCE);
        assert_eq!(controller.current_pane(), Pane::Editor);
        assert_eq!(
            controller.status_line().status_message(),
            Some("Ctrl-F format | Ctrl-R run | Esc cancel | Ctrl-C quit")
        );
    }

    #[tokio::test]
    async fn format_key_should_show_progress_then_apply_result() {
        let transport = Arc::new(ScriptedTransport::new(vec![OperationResult::formatted(
            "package main\n",
            None,
        )]));
        let (mut controller, screen) =
            controller_with("package  main", transport.clone(), vec![]);

        controller.process_key_event(ctrl('f')).unwrap();
        assert_eq!(
            controller.submission().state(),
            &UiState::Pending(OperationKind::Format)
        );
        assert!(screen.screen_contains("Formatting..."));

        let completion = controller.wait_for_completion().await.unwrap();
        assert_eq!(completion, Some(Completion::Applied(OperationKind::Format)));
        assert_eq!(controller.submission().editor().get_value(), "package main\n");
        assert!(screen.screen_contains("  1 package main"));
        assert!(screen.screen_contains("reformatted code"));
        assert_eq!(transport.requests()[0].1, "package  main");
    }

    #[tokio::test]
    async fn key_hint_should_return_after_operation_completes() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Failure::remote("syntax error").into()
        ]));
        let (mut controller, _) = controller_with("}", transport, vec![]);
        let hint = controller.status_line().status_message().map(str::to_string);

        controller.process_key_event(ctrl('r')).unwrap();
        assert_eq!(controller.status_line().status_message(), None);

        controller.wait_for_completion().await.unwrap();
        assert!(matches!(controller.submission().state(), UiState::Failed(_)));
        assert_eq!(
            controller.status_line().status_message().map(str::to_string),
            hint
        );
    }

    #[tokio::test]
    async fn second_submit_while_pending_should_report_busy() {
        let (mut controller, screen) =
            controller_with("x", Arc::new(StalledTransport), vec![]);

        controller.process_key_event(ctrl('r')).unwrap();
        controller.process_key_event(ctrl('f')).unwrap();

        assert_eq!(
            controller.submission().state(),
            &UiState::Pending(OperationKind::Benchmark)
        );
        assert_eq!(
            controller.status_line().status_message(),
            Some("run is already in progress")
        );
        assert!(screen.screen_contains("run is already in progress"));
    }

    #[tokio::test]
    async fn editing_should_cancel_pending_format_only() {
        let (mut controller, _) = controller_with("x", Arc::new(StalledTransport), vec![]);

        controller.process_key_event(ctrl('f')).unwrap();
        controller.process_key_event(key(KeyCode::Char('y'))).unwrap();
        assert_eq!(controller.submission().state(), &UiState::Idle);
        assert_eq!(controller.submission().editor().get_value(), "yx");

        controller.process_key_event(ctrl('r')).unwrap();
        controller.process_key_event(key(KeyCode::Char('z'))).unwrap();
        assert_eq!(
            controller.submission().state(),
            &UiState::Pending(OperationKind::Benchmark)
        );
    }

    #[tokio::test]
    async fn escape_should_cancel_pending_operation() {
        let (mut controller, screen) =
            controller_with("x", Arc::new(StalledTransport), vec![]);

        controller.process_key_event(ctrl('r')).unwrap();
        controller.process_key_event(key(KeyCode::Esc)).unwrap();

        assert_eq!(controller.submission().state(), &UiState::Idle);
        assert!(screen.screen_contains("Cancelled"));
        assert!(screen.screen_contains("Ready"));
    }

    #[tokio::test]
    async fn benchmark_failure_should_render_error_and_leave_focus() {
        let transport = Arc::new(ScriptedTransport::new(vec![Failure::remote(
            "syntax error: unexpected }",
        )
        .into()]));
        let (mut controller, screen) = controller_with("func}", transport, vec![]);

        controller.process_key_event(ctrl('w')).unwrap();
        assert_eq!(controller.current_pane(), Pane::Output);

        controller.process_key_event(ctrl('r')).unwrap();
        controller.wait_for_completion().await.unwrap();

        assert!(screen.screen_contains("syntax error: unexpected }"));
        assert!(screen.get_buffer_string().contains("\x1b[38;5;9m"));
        assert_eq!(controller.submission().editor().get_value(), "func}");
        assert_eq!(controller.current_pane(), Pane::Output);
        assert!(!controller.submission().editor().is_focused());
        assert!(!controller.submission().is_pending());
    }

    #[tokio::test]
    async fn output_pane_should_scroll_long_reports() {
        let report = (1..=30).map(|n| format!("Benchmark{n}")).collect::<Vec<_>>().join("<br>");
        let transport = Arc::new(ScriptedTransport::new(vec![OperationResult::benchmarked(
            BenchmarkReport::new(serde_json::Value::String(report)),
            None,
        )]));
        let (mut controller, screen) = controller_with("x", transport, vec![]);

        controller.process_key_event(ctrl('r')).unwrap();
        controller.wait_for_completion().await.unwrap();
        controller.process_key_event(ctrl('w')).unwrap();
        controller.process_key_event(key(KeyCode::End)).unwrap();

        assert!(controller.output_scroll() > 0);
        assert!(screen.screen_contains("Benchmark30"));

        controller.process_key_event(key(KeyCode::Home)).unwrap();
        assert_eq!(controller.output_scroll(), 0);
        assert!(screen.screen_contains("Benchmarks finished"));
    }

    #[tokio::test]
    async fn run_should_process_events_until_quit_and_restore_terminal() {
        let events = vec![
            Event::Key(key(KeyCode::End)),
            Event::Key(KeyEvent::new(KeyCode::Char('!'), KeyModifiers::SHIFT)),
            Event::Resize(70, 22),
            Event::Key(ctrl('q')),
            Event::Key(key(KeyCode::Char('x'))),
        ];
        let (mut controller, screen) =
            controller_with("package main", Arc::new(StalledTransport), events);

        controller.run().await.unwrap();

        assert!(controller.should_quit());
        assert_eq!(controller.submission().editor().get_value(), "package main!");
        assert!(screen.has_command(&RenderCommand::EnterAlternateScreen));
        assert!(screen.has_command(&RenderCommand::LeaveAlternateScreen));
        assert!(!screen.is_raw_mode());
    }
}
