//! # Submission Controller
//!
//! Runs at most one remote operation at a time against the editor's
//! content and owns the UI state shown in the output region.
//!
//! ```text
//! Idle ──begin──▶ Pending(kind) ──finish──▶ Succeeded | Failed
//!   ▲                  │                          │
//!   └──── cancel ──────┘         next begin ◀─────┘
//! ```
//!
//! A second submission while one is pending is rejected and changes
//! nothing. Every submission gets a ticket; a result whose ticket is not
//! the one in flight (e.g. it arrived after a cancel) is dropped, so a
//! stale response can never overwrite newer editor content.

use crate::repl::events::{Pane, ViewEvent};
use crate::repl::models::{
    EditorAdapter, Failure, OperationKind, OperationResult, Payload, SuccessReport, UiState,
};
use crate::repl::services::Transport;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Reasons a submission is refused
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("{0} is already in progress")]
    AlreadyPending(OperationKind),
}

/// Identifies one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    id: u64,
    kind: OperationKind,
}

impl Ticket {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

/// What happened to a delivered result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result was applied and the state is now terminal
    Applied(OperationKind),
    /// The result belonged to a cancelled or superseded submission
    Stale,
}

/// Result sent back by a spawned transport task
#[derive(Debug)]
struct Delivery {
    ticket: Ticket,
    result: OperationResult,
}

struct InFlight {
    ticket: Ticket,
    /// Editor content captured when the submission started
    source: String,
    started: Instant,
    task: Option<JoinHandle<()>>,
}

pub struct SubmissionController<E: EditorAdapter> {
    editor: E,
    transport: Arc<dyn Transport>,
    state: UiState,
    in_flight: Option<InFlight>,
    next_ticket_id: u64,
    last_duration_ms: Option<u64>,
    pending_view_events: Vec<ViewEvent>,
    delivery_sender: mpsc::Sender<Delivery>,
    delivery_receiver: mpsc::Receiver<Delivery>,
}

impl<E: EditorAdapter> SubmissionController<E> {
    pub fn new(editor: E, transport: Arc<dyn Transport>) -> Self {
        let (delivery_sender, delivery_receiver) = mpsc::channel(8);
        Self {
            editor,
            transport,
            state: UiState::Idle,
            in_flight: None,
            next_ticket_id: 1,
            last_duration_ms: None,
            pending_view_events: Vec::new(),
            delivery_sender,
            delivery_receiver,
        }
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Elapsed time of the last applied operation
    pub fn last_duration_ms(&self) -> Option<u64> {
        self.last_duration_ms
    }

    /// Enter `Pending(kind)` and snapshot the editor content.
    ///
    /// Rejected without any state change while another operation is pending.
    pub fn begin(&mut self, kind: OperationKind) -> Result<Ticket, SubmitError> {
        if let Some(in_flight) = &self.in_flight {
            tracing::warn!(
                "Rejecting {} submission: {} still pending",
                kind,
                in_flight.ticket.kind
            );
            return Err(SubmitError::AlreadyPending(in_flight.ticket.kind));
        }

        let ticket = Ticket {
            id: self.next_ticket_id,
            kind,
        };
        self.next_ticket_id += 1;

        self.in_flight = Some(InFlight {
            ticket,
            source: self.editor.get_value(),
            started: Instant::now(),
            task: None,
        });
        self.state = UiState::Pending(kind);
        tracing::debug!("Submission {} started: {}", ticket.id, kind);

        // Progress indicator goes up before the request is sent
        self.emit_view_event([
            ViewEvent::OutputRedrawRequired,
            ViewEvent::StatusBarUpdateRequired,
        ]);

        Ok(ticket)
    }

    /// Apply the result for `ticket`. Results for any other ticket are dropped.
    pub fn finish(&mut self, ticket: Ticket, result: OperationResult) -> Completion {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.ticket == ticket => in_flight,
            other => {
                self.in_flight = other;
                tracing::debug!("Dropping stale result for submission {}", ticket.id);
                return Completion::Stale;
            }
        };

        let kind = ticket.kind;
        let elapsed_ms = in_flight.started.elapsed().as_millis() as u64;
        self.last_duration_ms = Some(elapsed_ms);

        self.state = match result {
            OperationResult::Succeeded { payload, .. } if payload.kind() != kind => {
                UiState::Failed(Failure::transport(format!(
                    "service answered {} with a {} result",
                    kind,
                    payload.kind()
                )))
            }
            OperationResult::Succeeded { payload, notice } => {
                if let Payload::FormattedCode(code) = &payload {
                    self.editor.set_value(code);
                    self.emit_view_event([ViewEvent::EditorRedrawRequired]);
                }
                UiState::Succeeded(SuccessReport {
                    source: in_flight.source,
                    payload,
                    notice,
                })
            }
            OperationResult::Failed(failure) => UiState::Failed(failure),
        };

        match &self.state {
            UiState::Failed(failure) => {
                tracing::warn!("{} failed after {}ms: {}", kind, elapsed_ms, failure.message)
            }
            _ => tracing::info!("{} succeeded in {}ms", kind, elapsed_ms),
        }

        self.emit_view_event([
            ViewEvent::OutputRedrawRequired,
            ViewEvent::StatusBarUpdateRequired,
        ]);

        // Formatting is followed by more editing; benchmarks leave focus alone
        if kind == OperationKind::Format {
            self.editor.focus();
            self.emit_view_event([ViewEvent::FocusChanged { pane: Pane::Editor }]);
        }

        Completion::Applied(kind)
    }

    /// Run one operation to completion on the current task
    pub async fn submit(&mut self, kind: OperationKind) -> Result<Completion, SubmitError> {
        let ticket = self.begin(kind)?;
        let source = self.in_flight_source();
        let transport = Arc::clone(&self.transport);

        let result = transport.send(kind, &source).await;
        Ok(self.finish(ticket, result))
    }

    /// Start an operation on a background task. The result is picked up by
    /// [`poll_completion`](Self::poll_completion) or
    /// [`next_completion`](Self::next_completion).
    pub fn dispatch(&mut self, kind: OperationKind) -> Result<Ticket, SubmitError> {
        let ticket = self.begin(kind)?;
        let source = self.in_flight_source();
        let transport = Arc::clone(&self.transport);
        let sender = self.delivery_sender.clone();

        let task = tokio::spawn(async move {
            let result = transport.send(kind, &source).await;
            // Ignore send errors (controller might have been dropped)
            let _ = sender.send(Delivery { ticket, result }).await;
        });

        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.task = Some(task);
        }
        Ok(ticket)
    }

    /// Apply a delivered result if one is waiting (non-blocking).
    ///
    /// A task that ended without delivering fails the submission.
    pub fn poll_completion(&mut self) -> Option<Completion> {
        self.drain_deliveries().or_else(|| self.reap_finished_task())
    }

    /// Wait for the dispatched operation to complete.
    ///
    /// Returns `None` straight away if nothing was dispatched.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        loop {
            let task = self.in_flight.as_mut()?.task.as_mut()?;
            let delivery = tokio::select! {
                biased;
                delivery = self.delivery_receiver.recv() => delivery,
                _ = task => None,
            };

            match delivery {
                Some(Delivery { ticket, result }) => {
                    if let Completion::Applied(kind) = self.finish(ticket, result) {
                        return Some(Completion::Applied(kind));
                    }
                }
                None => return self.reap_finished_task(),
            }
        }
    }

    /// Best-effort cancellation of the pending operation.
    ///
    /// Returns to `Idle`. A result that still arrives is dropped as stale.
    pub fn cancel(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };

        if let Some(task) = in_flight.task {
            task.abort();
        }
        tracing::info!(
            "Cancelled {} (submission {})",
            in_flight.ticket.kind,
            in_flight.ticket.id
        );

        self.state = UiState::Idle;
        self.emit_view_event([
            ViewEvent::OutputRedrawRequired,
            ViewEvent::StatusBarUpdateRequired,
        ]);
        true
    }

    /// Drain view events emitted since the last call
    pub fn collect_pending_view_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.pending_view_events)
    }

    fn emit_view_event(&mut self, events: impl IntoIterator<Item = ViewEvent>) {
        self.pending_view_events.extend(events);
    }

    fn drain_deliveries(&mut self) -> Option<Completion> {
        while let Ok(delivery) = self.delivery_receiver.try_recv() {
            if let Completion::Applied(kind) = self.finish(delivery.ticket, delivery.result) {
                return Some(Completion::Applied(kind));
            }
        }
        None
    }

    /// Fail the submission whose task finished without delivering a result
    fn reap_finished_task(&mut self) -> Option<Completion> {
        let ticket = match &self.in_flight {
            Some(InFlight {
                ticket,
                task: Some(task),
                ..
            }) if task.is_finished() => *ticket,
            _ => return None,
        };

        // The task delivers before it finishes
        if let Some(completion) = self.drain_deliveries() {
            return Some(completion);
        }

        tracing::warn!("Submission {} ended without a result", ticket.id);
        Some(self.finish(
            ticket,
            OperationResult::Failed(Failure::transport("request task ended without a result")),
        ))
    }

    fn in_flight_source(&self) -> String {
        self.in_flight
            .as_ref()
            .map(|in_flight| in_flight.source.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::models::{BenchmarkReport, EditorModel, FailureOrigin};
    use crate::repl::testing::{ScriptedTransport, StalledTransport};
    use serde_json::json;
    use std::time::Duration;

    const UNFORMATTED: &str = "package main\nfunc  main(){}";
    const FORMATTED: &str = "package main\n\nfunc main() {}\n";

    fn controller_with(
        text: &str,
        responses: Vec<OperationResult>,
    ) -> (SubmissionController<EditorModel>, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(responses));
        let controller = SubmissionController::new(EditorModel::new(text), transport.clone());
        (controller, transport)
    }

    #[tokio::test]
    async fn format_success_should_replace_editor_content_and_refocus() {
        let (mut controller, transport) = controller_with(
            UNFORMATTED,
            vec![OperationResult::formatted(FORMATTED, None)],
        );
        controller.editor_mut().blur();

        let completion = controller.submit(OperationKind::Format).await.unwrap();

        assert_eq!(completion, Completion::Applied(OperationKind::Format));
        assert_eq!(controller.editor().get_value(), FORMATTED);
        assert!(controller.editor().is_focused());
        assert!(matches!(controller.state(), UiState::Succeeded(_)));
        assert_eq!(
            transport.requests(),
            vec![(OperationKind::Format, UNFORMATTED.to_string())]
        );
        assert!(controller.last_duration_ms().is_some());
    }

    #[tokio::test]
    async fn format_failure_should_leave_editor_untouched() {
        let (mut controller, _) = controller_with(
            UNFORMATTED,
            vec![Failure::remote("expected declaration, found fun").into()],
        );

        controller.submit(OperationKind::Format).await.unwrap();

        assert_eq!(controller.editor().get_value(), UNFORMATTED);
        match controller.state() {
            UiState::Failed(failure) => {
                assert_eq!(failure.origin, FailureOrigin::Remote);
                assert_eq!(failure.message, "expected declaration, found fun");
            }
            other => panic!("Expected Failed state, got {other:?}"),
        }
        assert!(!controller.is_pending());
    }

    #[tokio::test]
    async fn benchmark_should_never_touch_editor_or_focus() {
        let report = BenchmarkReport::new(json!({"BenchmarkSum": "12 ns/op"}));
        let (mut controller, _) = controller_with(
            UNFORMATTED,
            vec![
                OperationResult::benchmarked(report.clone(), None),
                Failure::remote("syntax error: unexpected }").into(),
            ],
        );
        controller.editor_mut().blur();
        let revision = controller.editor().revision();

        controller.submit(OperationKind::Benchmark).await.unwrap();
        match controller.state() {
            UiState::Succeeded(success) => {
                assert_eq!(success.source, UNFORMATTED);
                assert_eq!(success.payload, Payload::BenchmarkReport(report));
            }
            other => panic!("Expected Succeeded state, got {other:?}"),
        }

        controller.submit(OperationKind::Benchmark).await.unwrap();
        assert!(matches!(controller.state(), UiState::Failed(_)));

        assert_eq!(controller.editor().get_value(), UNFORMATTED);
        assert_eq!(controller.editor().revision(), revision);
        assert!(!controller.editor().is_focused());
        let events = controller.collect_pending_view_events();
        assert!(!events.contains(&ViewEvent::EditorRedrawRequired));
        assert!(!events.iter().any(|e| matches!(e, ViewEvent::FocusChanged { .. })));
    }

    #[test]
    fn second_begin_while_pending_should_be_rejected_without_side_effects() {
        let (mut controller, _) = controller_with("x", vec![]);

        let first = controller.begin(OperationKind::Benchmark).unwrap();
        controller.collect_pending_view_events();

        let second = controller.begin(OperationKind::Format);
        assert_eq!(second, Err(SubmitError::AlreadyPending(OperationKind::Benchmark)));
        assert_eq!(controller.state(), &UiState::Pending(OperationKind::Benchmark));
        assert!(controller.collect_pending_view_events().is_empty());

        assert_eq!(
            controller.finish(first, OperationResult::benchmarked(BenchmarkReport::default(), None)),
            Completion::Applied(OperationKind::Benchmark)
        );
    }

    #[test]
    fn begin_should_emit_progress_render() {
        let (mut controller, _) = controller_with("x", vec![]);
        controller.begin(OperationKind::Format).unwrap();

        assert_eq!(controller.state(), &UiState::Pending(OperationKind::Format));
        assert!(controller
            .collect_pending_view_events()
            .contains(&ViewEvent::OutputRedrawRequired));
    }

    #[test]
    fn result_for_cancelled_ticket_should_be_dropped() {
        let (mut controller, _) = controller_with("original", vec![]);

        let cancelled = controller.begin(OperationKind::Format).unwrap();
        assert!(controller.cancel());
        assert_eq!(controller.state(), &UiState::Idle);

        let current = controller.begin(OperationKind::Benchmark).unwrap();
        let stale = controller.finish(cancelled, OperationResult::formatted("overwritten", None));

        assert_eq!(stale, Completion::Stale);
        assert_eq!(controller.editor().get_value(), "original");
        assert_eq!(controller.state(), &UiState::Pending(OperationKind::Benchmark));

        assert_eq!(
            controller.finish(current, Failure::transport("network error").into()),
            Completion::Applied(OperationKind::Benchmark)
        );
    }

    #[test]
    fn cancel_without_pending_operation_should_do_nothing() {
        let (mut controller, _) = controller_with("x", vec![]);
        assert!(!controller.cancel());
        assert!(controller.collect_pending_view_events().is_empty());
    }

    #[test]
    fn mismatched_payload_should_become_failure() {
        let (mut controller, _) = controller_with("x", vec![]);
        let ticket = controller.begin(OperationKind::Format).unwrap();

        controller.finish(
            ticket,
            OperationResult::benchmarked(BenchmarkReport::default(), None),
        );

        assert_eq!(controller.editor().get_value(), "x");
        match controller.state() {
            UiState::Failed(failure) => assert_eq!(failure.origin, FailureOrigin::Transport),
            other => panic!("Expected Failed state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatched_operation_should_complete_through_channel() {
        let (mut controller, _) = controller_with(
            UNFORMATTED,
            vec![OperationResult::formatted(FORMATTED, Some("reformatted code".into()))],
        );

        controller.dispatch(OperationKind::Format).unwrap();
        assert!(controller.state().is_pending());
        assert_eq!(
            controller.dispatch(OperationKind::Benchmark),
            Err(SubmitError::AlreadyPending(OperationKind::Format))
        );

        let completion = controller.next_completion().await;
        assert_eq!(completion, Some(Completion::Applied(OperationKind::Format)));
        assert_eq!(controller.editor().get_value(), FORMATTED);
        assert_eq!(controller.poll_completion(), None);
    }

    #[tokio::test]
    async fn task_ending_without_result_should_fail_instead_of_hanging() {
        // No scripted response, so the spawned send panics
        let (mut controller, _) = controller_with(UNFORMATTED, vec![]);

        controller.dispatch(OperationKind::Format).unwrap();
        let completion =
            tokio::time::timeout(Duration::from_secs(5), controller.next_completion())
                .await
                .expect("next_completion hung on a dead task");

        assert_eq!(completion, Some(Completion::Applied(OperationKind::Format)));
        assert!(!controller.is_pending());
        assert_eq!(controller.editor().get_value(), UNFORMATTED);
        match controller.state() {
            UiState::Failed(failure) => assert_eq!(failure.origin, FailureOrigin::Transport),
            other => panic!("Expected Failed state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn poll_completion_should_fail_submission_whose_task_died() {
        let (mut controller, _) = controller_with("x", vec![]);

        controller.dispatch(OperationKind::Benchmark).unwrap();
        let mut completion = None;
        for _ in 0..100 {
            completion = controller.poll_completion();
            if completion.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(completion, Some(Completion::Applied(OperationKind::Benchmark)));
        assert!(matches!(controller.state(), UiState::Failed(_)));
        assert_eq!(controller.poll_completion(), None);
    }

    #[tokio::test]
    async fn next_completion_without_dispatch_should_return_immediately() {
        let (mut controller, _) = controller_with("x", vec![]);
        assert_eq!(controller.next_completion().await, None);
    }

    #[tokio::test]
    async fn cancelling_dispatched_operation_should_return_to_idle() {
        let mut controller =
            SubmissionController::new(EditorModel::new("x"), Arc::new(StalledTransport));

        controller.dispatch(OperationKind::Benchmark).unwrap();
        assert!(controller.cancel());

        assert_eq!(controller.state(), &UiState::Idle);
        assert!(!controller.is_pending());
        assert_eq!(controller.poll_completion(), None);
        assert!(controller.begin(OperationKind::Format).is_ok());
    }

    #[tokio::test]
    async fn formatting_formatted_code_should_be_idempotent() {
        let (mut controller, transport) = controller_with(
            FORMATTED,
            vec![OperationResult::formatted(FORMATTED, None)],
        );

        controller.submit(OperationKind::Format).await.unwrap();

        assert_eq!(controller.editor().get_value(), FORMATTED);
        assert_eq!(transport.requests()[0].1, FORMATTED);
    }
}
