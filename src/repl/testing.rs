//! Testing infrastructure for REPL components
//!
//! Scripted stand-ins for the remote service so the controllers can be
//! exercised without a network.

use crate::repl::models::{OperationKind, OperationResult};
use crate::repl::services::Transport;
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Transport that replays queued results and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<OperationResult>>,
    requests: Mutex<Vec<(OperationKind, String)>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<OperationResult>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<(OperationKind, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, kind: OperationKind, code: &str) -> OperationResult {
        self.requests.lock().unwrap().push((kind, code.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedTransport ran out of responses")
    }
}

/// Transport whose requests never complete, for cancellation tests
#[derive(Default)]
pub struct StalledTransport;

#[async_trait]
impl Transport for StalledTransport {
    async fn send(&self, _kind: OperationKind, _code: &str) -> OperationResult {
        std::future::pending::<OperationResult>().await
    }
}

/// Key event with no modifiers
pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

/// Key event with the control modifier
pub fn ctrl(ch: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
}
