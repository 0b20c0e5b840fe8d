//! Platform-specific process signalling.
//!
//! Children launched by the harness lead their own process group on Unix, so
//! termination signals go to the whole group and reach anything the server
//! forked. Other platforms only get the forced kill provided by tokio.

use crate::error::{ProbeError, Result};
use tracing::{debug, warn};

/// Check if a process with the given PID is alive.
///
/// # Platform Behavior
/// - **Linux/macOS**: `kill(pid, 0)`; a zombie still counts as alive until reaped
/// - **Other**: assumed alive
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => true,
            // Exists but belongs to someone else
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    {
        warn!("Process alive check not implemented for this platform");
        let _ = pid;
        true
    }
}

/// Ask a process group to shut down gracefully.
///
/// Returns `Ok(true)` if a signal was delivered, `Ok(false)` if the group was
/// already gone or the platform has no graceful signal.
pub fn request_terminate(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;
        signal_group(pid, Signal::SIGTERM, true)
    }

    #[cfg(not(unix))]
    {
        debug!("No graceful termination signal on this platform for {}", pid);
        Ok(false)
    }
}

/// Force-kill every process in the group led by `pid`.
///
/// The leader itself is killed and reaped through its tokio handle; this only
/// catches stragglers it spawned. Never signals `pid` outside its group, since
/// a reaped leader's PID may already belong to another process.
pub fn kill_group(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;
        signal_group(pid, Signal::SIGKILL, false)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Ok(false)
    }
}

#[cfg(unix)]
fn signal_group(
    pid: u32,
    signal: nix::sys::signal::Signal,
    leader_fallback: bool,
) -> Result<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg};
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);

    debug!("Sending {} to process group {}", signal, pid);
    match killpg(nix_pid, signal) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) if !leader_fallback => Ok(false),
        Err(Errno::ESRCH) => {
            // Group is empty. A group leader cannot setsid(), so the leader is
            // only still alive here if it moved itself with setpgid().
            match kill(nix_pid, signal) {
                Ok(()) => Ok(true),
                Err(Errno::ESRCH) => Ok(false),
                Err(e) => Err(ProbeError::Stop {
                    pid,
                    message: format!("{} failed: {}", signal, e),
                }),
            }
        }
        Err(e) if !leader_fallback => Err(ProbeError::Stop {
            pid,
            message: format!("killpg {} failed: {}", signal, e),
        }),
        Err(e) => {
            warn!("killpg({}, {}) failed: {}, signalling leader only", pid, signal, e);
            kill(nix_pid, signal).map(|_| true).map_err(|e| ProbeError::Stop {
                pid,
                message: format!("{} failed: {}", signal, e),
            })
        }
    }
}
