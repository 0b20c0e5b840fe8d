//! Orchestration of start, readiness, probe and stop.

use super::client;
use super::readiness::{self, Readiness, ReadinessPolicy};
use super::request::ProbeRequest;
use super::result::ProbeResult;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::process::{LaunchSpec, ManagedProcess, OutputLog, ProcessLauncher, Termination};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Everything a [`ProcessProbe::run`] observed.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: ProbeResult,
    pub readiness: Readiness,
    /// PID of the server that was launched.
    pub pid: u32,
    /// `None` only if cleanup itself failed; the child is still killed on drop.
    pub termination: Option<Termination>,
    /// Captured output tail of the server.
    pub output: OutputLog,
}

impl RunReport {
    pub fn exit_code(&self) -> u8 {
        self.result.outcome.exit_code()
    }
}

/// Launches a server, probes it once, and always cleans it up.
#[derive(Debug, Clone)]
pub struct ProcessProbe {
    client: Client,
}

impl ProcessProbe {
    /// Create a probe with its own HTTP client.
    ///
    /// The client ignores proxy settings from the environment and never follows
    /// redirects, so a probe is exactly one request to the server under test.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(ProbeConfig::USER_AGENT)
            .no_proxy()
            .redirect(Policy::none())
            .build()
            .map_err(|e| ProbeError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Spawn the server described by `spec`.
    pub async fn start(&self, spec: &LaunchSpec) -> Result<ManagedProcess> {
        ProcessLauncher::launch(spec).await
    }

    /// Wait until `process` is ready according to `policy`.
    pub async fn await_readiness(
        &self,
        process: &mut ManagedProcess,
        policy: &ReadinessPolicy,
    ) -> Readiness {
        readiness::await_readiness(&self.client, process, policy).await
    }

    /// Send `request` exactly once. Never retries.
    pub async fn probe(&self, request: &ProbeRequest, timeout: Duration) -> ProbeResult {
        client::execute(&self.client, request, timeout).await
    }

    /// Terminate `process`, force-killing it after `grace`.
    pub async fn stop(
        &self,
        process: &mut ManagedProcess,
        grace: Duration,
    ) -> Result<Termination> {
        process.stop(grace).await
    }

    /// start → await readiness → probe → stop.
    ///
    /// Only launch failures are returned as errors; once the process exists it
    /// is stopped before this returns, whatever the probe observed.
    pub async fn run(
        &self,
        spec: &LaunchSpec,
        request: &ProbeRequest,
        readiness: &ReadinessPolicy,
        timeout: Duration,
        grace: Duration,
    ) -> Result<RunReport> {
        let mut process = self.start(spec).await?;
        let pid = process.pid();
        let started = Instant::now();

        let readiness = self.await_readiness(&mut process, readiness).await;
        let result = match &readiness {
            Readiness::Ready { .. } => self.probe(request, timeout).await,
            Readiness::TimedOut {
                attempts,
                last_error,
                ..
            } => ProbeResult::readiness_timeout(
                format!(
                    "server not ready after {} checks{}",
                    attempts,
                    last_error
                        .as_deref()
                        .map(|e| format!(", last error: {}", e))
                        .unwrap_or_default()
                ),
                started.elapsed(),
            ),
            Readiness::ProcessExited(termination) => ProbeResult::process_exited(
                format!("server {} before it was probed", termination),
                started.elapsed(),
            ),
        };

        info!("Probe finished: {}", result.summary());

        let termination = match self.stop(&mut process, grace).await {
            Ok(termination) => Some(termination),
            Err(e) => {
                error!("Cleanup of process {} failed: {}", pid, e);
                None
            }
        };

        Ok(RunReport {
            result,
            readiness,
            pid,
            termination,
            output: process.output().clone(),
        })
    }
}
