//! Process launching functionality.

use super::managed::ManagedProcess;
use super::output::{spawn_drain, LogSink, OutputLog, OutputStream};
use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::platform;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Configuration for launching the server under test.
///
/// Built once through the `with_*` methods and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    program: PathBuf,
    args: Vec<String>,
    env_vars: HashMap<String, String>,
    current_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    listen_addr: Option<String>,
}

impl LaunchSpec {
    /// Create a launch spec for `program` with no arguments.
    ///
    /// A bare name is resolved through `PATH` at spawn time.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env_vars: HashMap::new(),
            current_dir: None,
            log_file: None,
            listen_addr: None,
        }
    }

    /// Launch spec for a text-embeddings router serving `model_id`.
    ///
    /// Produces `--model-id <id> --port <port> --hostname <host>` and records
    /// the listen address for the port preflight.
    pub fn text_embeddings_router(
        program: impl Into<PathBuf>,
        model_id: &str,
        host: &str,
        port: u16,
    ) -> Self {
        Self::new(program)
            .with_arg("--model-id")
            .with_arg(model_id)
            .with_arg("--port")
            .with_arg(port.to_string())
            .with_arg("--hostname")
            .with_arg(host)
            .with_listen_addr(format!("{}:{}", platform::connectable_host(host), port))
    }

    /// Append extra arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append an argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn with_current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Also copy stdout/stderr to this file.
    pub fn with_log_file(mut self, path: impl AsRef<Path>) -> Self {
        self.log_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Address (`host:port`) the process is expected to bind.
    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env_vars(&self) -> &HashMap<String, String> {
        &self.env_vars
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn listen_addr(&self) -> Option<&str> {
        self.listen_addr.as_deref()
    }

    /// Program name for messages.
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// The full command line, space separated.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program_name())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Spawns [`LaunchSpec`]s into [`ManagedProcess`]es.
pub struct ProcessLauncher;

impl ProcessLauncher {
    const PREFLIGHT_TIMEOUT: Duration = Duration::from_millis(500);

    /// Launch a process with the given configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn launch(spec: &LaunchSpec) -> Result<ManagedProcess> {
        if let Some(addr) = spec.listen_addr() {
            if platform::is_accepting(addr, Self::PREFLIGHT_TIMEOUT).await {
                error!("Something is already listening on {}", addr);
                return Err(ProbeError::PortInUse {
                    addr: addr.to_string(),
                });
            }
        }

        let sink = match spec.log_file() {
            Some(path) => Some(Self::open_log_file(path)?),
            None => None,
        };

        // Build command
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.args());
        cmd.envs(spec.env_vars());
        if let Some(ref dir) = spec.current_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // Lead a new process group so termination reaches forked workers
        #[cfg(unix)]
        cmd.process_group(0);

        info!("Starting server with command: {}", spec.command_line());

        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to spawn {}: {}", spec.program_name(), e);
            ProbeError::launch(spec.program_name(), e)
        })?;

        let pid = child.id().ok_or_else(|| ProbeError::Launch {
            program: spec.program_name(),
            message: "process exited before its PID could be read".to_string(),
            source: None,
        })?;

        let output = OutputLog::new(ProbeConfig::OUTPUT_TAIL_LINES);
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(spawn_drain(
                stdout,
                OutputStream::Stdout,
                output.clone(),
                sink.clone(),
                ProbeConfig::OUTPUT_LINE_MAX_BYTES,
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(spawn_drain(
                stderr,
                OutputStream::Stderr,
                output.clone(),
                sink,
                ProbeConfig::OUTPUT_LINE_MAX_BYTES,
            ));
        }

        info!("Launched process with PID {}", pid);

        Ok(ManagedProcess::new(
            pid,
            spec.program_name(),
            child,
            output,
            drains,
        ))
    }

    fn open_log_file(path: &Path) -> Result<LogSink> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ProbeError::io_with_path(e, parent))?;
            }
        }

        let file = fs::File::create(path).map_err(|e| ProbeError::io_with_path(e, path))?;
        debug!("Copying server output to {}", path.display());
        Ok(Arc::new(tokio::sync::Mutex::new(tokio::fs::File::from_std(
            file,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_embeddings_router_args() {
        let spec = LaunchSpec::text_embeddings_router(
            "text-embeddings-router",
            "tomaarsen/Qwen3-Reranker-0.6B-seq-cls",
            "0.0.0.0",
            8081,
        );

        assert_eq!(
            spec.args(),
            &[
                "--model-id",
                "tomaarsen/Qwen3-Reranker-0.6B-seq-cls",
                "--port",
                "8081",
                "--hostname",
                "0.0.0.0",
            ]
        );
        assert_eq!(spec.listen_addr(), Some("127.0.0.1:8081"));
        assert_eq!(
            spec.command_line(),
            "text-embeddings-router --model-id tomaarsen/Qwen3-Reranker-0.6B-seq-cls \
             --port 8081 --hostname 0.0.0.0"
        );
    }

    #[test]
    fn test_launch_spec_builder() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let log_file = temp_dir.path().join("server.log");

        let spec = LaunchSpec::new("server")
            .with_args(["--a", "--b"])
            .with_env("CUDA_VISIBLE_DEVICES", "0")
            .with_log_file(&log_file);

        assert_eq!(spec.args(), &["--a", "--b"]);
        assert_eq!(
            spec.env_vars().get("CUDA_VISIBLE_DEVICES"),
            Some(&"0".to_string())
        );
        assert_eq!(spec.log_file(), Some(log_file.as_path()));
        assert!(spec.listen_addr().is_none());
    }

    #[tokio::test]
    async fn test_launch_missing_executable() {
        let spec = LaunchSpec::new("/nonexistent/definitely-not-a-server");
        let err = ProcessLauncher::launch(&spec).await.unwrap_err();

        assert!(err.is_launch_error());
        assert!(err.to_string().contains("executable not found"));
    }

    #[tokio::test]
    async fn test_launch_refuses_busy_port() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let spec = LaunchSpec::new("/nonexistent/never-spawned").with_listen_addr(&addr);
        let err = ProcessLauncher::launch(&spec).await.unwrap_err();

        assert!(matches!(err, ProbeError::PortInUse { addr: ref a } if a == &addr));
    }
}
