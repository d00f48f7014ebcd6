//! # Operation Model
//!
//! The two operations the remote service offers and the normalized shape
//! every response is folded into, whatever went wrong on the way.

use serde_json::Value;
use std::fmt;

/// Which remote operation a submission runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Reformat the source in canonical style
    Format,
    /// Compile the source and run its benchmarks
    Benchmark,
}

impl OperationKind {
    /// Short name matching the service endpoint
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Format => "fmt",
            OperationKind::Benchmark => "run",
        }
    }

    /// Text shown while the operation is in flight
    pub fn progress_label(&self) -> &'static str {
        match self {
            OperationKind::Format => "Formatting",
            OperationKind::Benchmark => "Running benchmarks",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Benchmark measurements as reported by the service.
///
/// The shape is owned by the service, so the value is carried through
/// untouched and only ever serialized for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BenchmarkReport(Value);

impl BenchmarkReport {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }

    /// Human-readable rendering: strings verbatim, null as nothing,
    /// everything else as pretty JSON
    pub fn to_display_string(&self) -> String {
        match &self.0 {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

/// What a successful operation produced
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    FormattedCode(String),
    BenchmarkReport(BenchmarkReport),
}

impl Payload {
    /// The operation this payload belongs to
    pub fn kind(&self) -> OperationKind {
        match self {
            Payload::FormattedCode(_) => OperationKind::Format,
            Payload::BenchmarkReport(_) => OperationKind::Benchmark,
        }
    }
}

/// Where a failure originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
    /// No well-formed JSON response was obtained
    Transport,
    /// The service answered but flagged `success: false`
    Remote,
}

/// A terminal failure for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub origin: FailureOrigin,
    pub message: String,
}

impl Failure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            origin: FailureOrigin::Transport,
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self {
            origin: FailureOrigin::Remote,
            message: message.into(),
        }
    }
}

/// Normalized outcome of a single submission
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    Succeeded {
        payload: Payload,
        /// Informational message from the service, if any
        notice: Option<String>,
    },
    Failed(Failure),
}

impl OperationResult {
    pub fn formatted(code: impl Into<String>, notice: Option<String>) -> Self {
        Self::Succeeded {
            payload: Payload::FormattedCode(code.into()),
            notice,
        }
    }

    pub fn benchmarked(report: BenchmarkReport, notice: Option<String>) -> Self {
        Self::Succeeded {
            payload: Payload::BenchmarkReport(report),
            notice,
        }
    }

    /// Failure message; present iff the operation failed
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed(failure) => Some(&failure.message),
        }
    }
}

impl From<Failure> for OperationResult {
    fn from(failure: Failure) -> Self {
        Self::Failed(failure)
    }
}
