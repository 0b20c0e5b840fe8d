//! Classified probe outcomes.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Outcome tag of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeOutcome {
    /// 2xx with a JSON body.
    Success,
    /// The server answered, but not with a 2xx JSON response.
    HttpFailure,
    /// The request never got an HTTP answer (refused, reset, DNS, bad URL).
    TransportError,
    /// No complete response within the request timeout.
    Timeout,
    /// The server never became ready, so no request was sent.
    ReadinessTimeout,
    /// The server exited before it could be probed.
    ProcessExited,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Success => "success",
            ProbeOutcome::HttpFailure => "http_failure",
            ProbeOutcome::TransportError => "transport_error",
            ProbeOutcome::Timeout => "timeout",
            ProbeOutcome::ReadinessTimeout => "readiness_timeout",
            ProbeOutcome::ProcessExited => "process_exited",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success)
    }

    /// Process exit code for the harness: 0 only on success.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything observed about one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub outcome: ProbeOutcome,
    /// HTTP status, when a response arrived.
    pub status: Option<u16>,
    /// Parsed JSON body.
    pub body: Option<Value>,
    /// Raw body text, kept for failures.
    pub raw_body: Option<String>,
    /// Error description for non-success outcomes.
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ProbeResult {
    fn bare(outcome: ProbeOutcome, elapsed: Duration) -> Self {
        Self {
            outcome,
            status: None,
            body: None,
            raw_body: None,
            error: None,
            elapsed,
        }
    }

    pub fn success(status: u16, body: Value, elapsed: Duration) -> Self {
        Self {
            status: Some(status),
            body: Some(body),
            ..Self::bare(ProbeOutcome::Success, elapsed)
        }
    }

    pub fn http_failure(
        status: u16,
        raw_body: String,
        error: Option<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status: Some(status),
            body: serde_json::from_str(&raw_body).ok(),
            raw_body: Some(raw_body),
            error,
            ..Self::bare(ProbeOutcome::HttpFailure, elapsed)
        }
    }

    pub fn transport_error(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::bare(ProbeOutcome::TransportError, elapsed)
        }
    }

    pub fn timeout(message: impl Into<String>, status: Option<u16>, elapsed: Duration) -> Self {
        Self {
            status,
            error: Some(message.into()),
            ..Self::bare(ProbeOutcome::Timeout, elapsed)
        }
    }

    pub fn readiness_timeout(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::bare(ProbeOutcome::ReadinessTimeout, elapsed)
        }
    }

    pub fn process_exited(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::bare(ProbeOutcome::ProcessExited, elapsed)
        }
    }

    /// One-line diagnostic.
    pub fn summary(&self) -> String {
        let mut line = self.outcome.to_string();
        if let Some(status) = self.status {
            line.push_str(&format!(" (HTTP {})", status));
        }
        line.push_str(&format!(" after {:?}", self.elapsed));
        if let Some(ref error) = self.error {
            line.push_str(": ");
            line.push_str(error);
        }
        line
    }
}
