//! # HTTP Transport
//!
//! Talks JSON over HTTP to the format/benchmark service and folds every
//! outcome, including network and protocol failures, into an
//! [`OperationResult`]. Nothing raised in here escapes `send`.

use crate::config::ServiceProfile;
use crate::repl::models::{BenchmarkReport, Failure, OperationKind, OperationResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fallback text when the service flags a failure without explaining it
pub const UNSPECIFIED_REMOTE_FAILURE: &str = "service reported failure";

/// Something that can run an operation against the remote service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit `code` for `kind`. Single attempt, never panics or errors;
    /// failures come back as `OperationResult::Failed`.
    async fn send(&self, kind: OperationKind, code: &str) -> OperationResult;
}

/// Failures that happen before a well-formed service response is obtained
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("network error")]
    Network(#[source] reqwest::Error),
    #[error("service returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("expected a JSON response but got content type '{0}'")]
    ContentType(String),
    #[error("malformed JSON response: {0}")]
    Decode(serde_json::Error),
    #[error("malformed response: missing '{0}' field")]
    MissingField(&'static str),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout(error)
        } else {
            TransportError::Network(error)
        }
    }
}

impl TransportError {
    /// The error followed by its full cause chain
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(&format!("\n  Caused by: {cause}"));
            source = cause.source();
        }
        message
    }
}

impl From<TransportError> for Failure {
    fn from(error: TransportError) -> Self {
        Failure::transport(error.describe())
    }
}

/// Request body for both endpoints
#[derive(Debug, Serialize)]
pub struct SubmitRequest<'a> {
    pub code: &'a str,
}

/// Response body shared by both endpoints
#[derive(Debug, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub benchmarks: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ServiceResponse {
    /// Map the service's own verdict onto the normalized result
    pub fn into_result(self, kind: OperationKind) -> Result<OperationResult, TransportError> {
        let message = self.message.filter(|m| !m.trim().is_empty());

        if !self.success {
            let message = message.unwrap_or_else(|| UNSPECIFIED_REMOTE_FAILURE.to_string());
            return Ok(Failure::remote(message).into());
        }

        match kind {
            OperationKind::Format => {
                let code = self.code.ok_or(TransportError::MissingField("code"))?;
                Ok(OperationResult::formatted(code, message))
            }
            OperationKind::Benchmark => {
                let report = BenchmarkReport::new(self.benchmarks.unwrap_or(Value::Null));
                Ok(OperationResult::benchmarked(report, message))
            }
        }
    }
}

/// Endpoint paths for the two operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub fmt: String,
    pub run: String,
}

impl Endpoints {
    pub fn url_for(&self, server: &str, kind: OperationKind) -> String {
        let path = match kind {
            OperationKind::Format => &self.fmt,
            OperationKind::Benchmark => &self.run,
        };
        format!("{server}{path}")
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    server: String,
    endpoints: Endpoints,
}

impl HttpTransport {
    /// Create a transport from a service profile
    pub fn new(profile: &ServiceProfile) -> anyhow::Result<Self> {
        tracing::debug!("Creating HttpTransport for {}", profile.server());
        let client = reqwest::Client::builder()
            .timeout(profile.timeout())
            .user_agent(concat!("benchpad/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            server: profile.server().to_string(),
            endpoints: Endpoints {
                fmt: profile.fmt_path().to_string(),
                run: profile.run_path().to_string(),
            },
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn url_for(&self, kind: OperationKind) -> String {
        self.endpoints.url_for(&self.server, kind)
    }

    async fn execute(&self, kind: OperationKind, code: &str) -> Result<OperationResult, TransportError> {
        let url = self.url_for(kind);
        tracing::debug!("POST {} ({} bytes of source)", url, code.len());

        let response = self
            .client
            .post(&url)
            .json(&SubmitRequest { code })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_json_content_type(&content_type) {
            return Err(TransportError::ContentType(content_type));
        }

        let bytes = response.bytes().await?;
        let parsed: ServiceResponse =
            serde_json::from_slice(&bytes).map_err(TransportError::Decode)?;
        parsed.into_result(kind)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, kind: OperationKind, code: &str) -> OperationResult {
        match self.execute(kind, code).await {
            Ok(result) => {
                if let Some(message) = result.message() {
                    tracing::info!("{} rejected by service: {}", kind, message);
                }
                result
            }
            Err(error) => {
                if let TransportError::Status { body, .. } = &error {
                    tracing::debug!("Error response body: {}", body);
                }
                let failure = Failure::from(error);
                tracing::warn!("{} request failed: {}", kind, failure.message);
                failure.into()
            }
        }
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}
