//! Waiting for a freshly spawned server to accept requests.

use super::backoff::Backoff;
use super::client::error_chain;
use crate::config::ReadinessConfig;
use crate::process::{ManagedProcess, Termination};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Active readiness check against a health endpoint.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// URL polled with GET; any 2xx means ready.
    pub url: String,
    /// Give up once this much time has passed since the first check.
    pub deadline: Duration,
    /// Timeout of each individual check.
    pub attempt_timeout: Duration,
    pub backoff: Backoff,
}

impl HealthCheck {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            deadline: ReadinessConfig::DEADLINE,
            attempt_timeout: ReadinessConfig::ATTEMPT_TIMEOUT,
            backoff: Backoff::default(),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// How to decide that the server is ready.
#[derive(Debug, Clone)]
pub enum ReadinessPolicy {
    /// Sleep for a fixed duration and assume the server is up.
    FixedDelay(Duration),
    /// Poll a health endpoint with backoff until it answers or the deadline passes.
    Poll(HealthCheck),
}

impl ReadinessPolicy {
    /// Fixed sleep of `ReadinessConfig::FIXED_DELAY`.
    pub fn fixed_default() -> Self {
        ReadinessPolicy::FixedDelay(ReadinessConfig::FIXED_DELAY)
    }
}

/// Result of waiting for readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready {
        attempts: u32,
        elapsed: Duration,
    },
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        last_error: Option<String>,
    },
    ProcessExited(Termination),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

pub(crate) async fn await_readiness(
    client: &Client,
    process: &mut ManagedProcess,
    policy: &ReadinessPolicy,
) -> Readiness {
    match policy {
        ReadinessPolicy::FixedDelay(delay) => {
            info!("Waiting {:?} for server to start...", delay);
            let started = Instant::now();
            tokio::time::sleep(*delay).await;

            match exited(process) {
                Some(termination) => Readiness::ProcessExited(termination),
                None => Readiness::Ready {
                    attempts: 0,
                    elapsed: started.elapsed(),
                },
            }
        }
        ReadinessPolicy::Poll(check) => poll(client, process, check).await,
    }
}

async fn poll(client: &Client, process: &mut ManagedProcess, check: &HealthCheck) -> Readiness {
    info!(
        "Waiting up to {:?} for {} to become ready...",
        check.deadline, check.url
    );

    let started = Instant::now();
    let mut attempts = 0u32;
    let mut last_error = None;

    loop {
        if let Some(termination) = exited(process) {
            return Readiness::ProcessExited(termination);
        }

        let remaining = check.deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            break;
        }

        attempts += 1;
        let attempt_timeout = check.attempt_timeout.min(remaining);
        match client.get(&check.url).timeout(attempt_timeout).send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    "Server ready after {:?} ({} checks)",
                    started.elapsed(),
                    attempts
                );
                return Readiness::Ready {
                    attempts,
                    elapsed: started.elapsed(),
                };
            }
            Ok(response) => {
                debug!("Health check {} returned {}", attempts, response.status());
                last_error = Some(format!("HTTP {}", response.status()));
            }
            Err(e) => {
                let message = error_chain(&e);
                debug!("Health check {} failed: {}", attempts, message);
                last_error = Some(message);
            }
        }

        let remaining = check.deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(check.backoff.delay(attempts - 1).min(remaining)).await;
    }

    warn!(
        "Server did not become ready within {:?} ({} checks)",
        check.deadline, attempts
    );
    Readiness::TimedOut {
        attempts,
        elapsed: started.elapsed(),
        last_error,
    }
}

fn exited(process: &mut ManagedProcess) -> Option<Termination> {
    match process.check_exited() {
        Ok(termination) => termination,
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}
