//! Exclusive ownership of a launched server process.

use super::output::OutputLog;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::platform;
use std::fmt;
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How a managed process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited on its own before `stop` signalled it.
    Exited(ExitStatus),
    /// Exited within the grace period after the termination signal.
    Graceful(ExitStatus),
    /// Force-killed after the grace period elapsed.
    Killed(ExitStatus),
}

impl Termination {
    pub fn status(&self) -> ExitStatus {
        match self {
            Termination::Exited(s) | Termination::Graceful(s) | Termination::Killed(s) => *s,
        }
    }

    pub fn was_forced(&self) -> bool {
        matches!(self, Termination::Killed(_))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exited(s) => write!(f, "exited on its own ({})", s),
            Termination::Graceful(s) => write!(f, "stopped gracefully ({})", s),
            Termination::Killed(s) => write!(f, "killed ({})", s),
        }
    }
}

/// Lifecycle state of a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Terminated(Termination),
}

/// A launched process, owned exclusively until it is terminated.
///
/// Only obtainable from [`super::ProcessLauncher::launch`]. All signalling goes
/// through [`ManagedProcess::stop`]; dropping a still-running process kills it.
pub struct ManagedProcess {
    pid: u32,
    program: String,
    child: Child,
    state: ProcessState,
    output: OutputLog,
    drains: Vec<JoinHandle<()>>,
    started_at: Instant,
}

impl fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("pid", &self.pid)
            .field("program", &self.program)
            .field("state", &self.state)
            .finish()
    }
}

impl ManagedProcess {
    pub(crate) fn new(
        pid: u32,
        program: String,
        child: Child,
        output: OutputLog,
        drains: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            pid,
            program,
            child,
            state: ProcessState::Running,
            output,
            drains,
            started_at: Instant::now(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, ProcessState::Terminated(_))
    }

    /// Captured stdout/stderr tail.
    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Check, without blocking, whether the process has exited on its own.
    ///
    /// Records the exit as [`Termination::Exited`] the first time it is seen.
    pub fn check_exited(&mut self) -> Result<Option<Termination>> {
        if let ProcessState::Terminated(termination) = self.state {
            return Ok(Some(termination));
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                warn!(
                    "Process {} ({}) exited unexpectedly after {:?}: {}",
                    self.pid,
                    self.program,
                    self.uptime(),
                    status
                );
                let termination = Termination::Exited(status);
                self.state = ProcessState::Terminated(termination);
                self.reap_group();
                Ok(Some(termination))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(ProbeError::Stop {
                pid: self.pid,
                message: format!("failed to poll exit status: {}", e),
            }),
        }
    }

    /// Terminate the process: signal, wait up to `grace`, then force-kill.
    ///
    /// Idempotent; later calls return the recorded [`Termination`].
    pub async fn stop(&mut self, grace: Duration) -> Result<Termination> {
        if let ProcessState::Terminated(termination) = self.state {
            debug!("Process {} already terminated: {}", self.pid, termination);
            self.finish_drains().await;
            return Ok(termination);
        }

        if let Some(termination) = self.check_exited()? {
            self.finish_drains().await;
            return Ok(termination);
        }

        info!("Stopping process {} (grace: {:?})", self.pid, grace);

        let signalled = match platform::request_terminate(self.pid) {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("Graceful termination of {} failed: {}", self.pid, e);
                false
            }
        };

        let graceful = if signalled {
            match tokio::time::timeout(grace, self.child.wait()).await {
                Ok(Ok(status)) => Some(Termination::Graceful(status)),
                Ok(Err(e)) => {
                    return Err(ProbeError::Stop {
                        pid: self.pid,
                        message: format!("wait failed: {}", e),
                    })
                }
                Err(_) => {
                    debug!("Process {} still running after {:?}", self.pid, grace);
                    None
                }
            }
        } else {
            None
        };

        let termination = match graceful {
            Some(termination) => termination,
            None => self.force_kill().await?,
        };

        self.state = ProcessState::Terminated(termination);
        self.reap_group();
        self.finish_drains().await;

        info!("Process {} {}", self.pid, termination);
        Ok(termination)
    }

    async fn force_kill(&mut self) -> Result<Termination> {
        debug!("Force-killing process {}", self.pid);

        if let Err(e) = platform::kill_group(self.pid) {
            warn!("Failed to kill process group {}: {}", self.pid, e);
        }
        if let Err(e) = self.child.start_kill() {
            // Already reaped is fine; anything else is not
            if self.child.try_wait().ok().flatten().is_none() {
                return Err(ProbeError::Stop {
                    pid: self.pid,
                    message: format!("kill failed: {}", e),
                });
            }
        }

        let status = self.child.wait().await.map_err(|e| ProbeError::Stop {
            pid: self.pid,
            message: format!("wait after kill failed: {}", e),
        })?;
        Ok(Termination::Killed(status))
    }

    /// Kill anything left in the process group once the leader is gone.
    fn reap_group(&self) {
        match platform::kill_group(self.pid) {
            Ok(true) => debug!("Killed leftover members of process group {}", self.pid),
            Ok(false) => {}
            Err(e) => debug!("Process group {} cleanup failed: {}", self.pid, e),
        }
    }

    /// Wait briefly for the output drains to hit EOF, then abandon them.
    async fn finish_drains(&mut self) {
        for mut handle in self.drains.drain(..) {
            if tokio::time::timeout(ProbeConfig::OUTPUT_DRAIN_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                debug!("Output drain still open, aborting it");
                handle.abort();
            }
        }
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if self.state == ProcessState::Running {
            warn!(
                "Process {} dropped while running, killing it without grace",
                self.pid
            );
            let _ = platform::kill_group(self.pid);
            let _ = self.child.start_kill();
        }
        for handle in &self.drains {
            handle.abort();
        }
    }
}
