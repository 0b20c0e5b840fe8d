//! Probe Core - launch an HTTP server, probe it once, always clean it up.
//!
//! The harness behind smoke tests of the form "start the server, wait until it
//! answers, send one request, report pass/fail". It owns the spawned process
//! for its whole life and terminates it on every exit path.
//!
//! # Example
//!
//! ```rust,no_run
//! use probe_core::{
//!     HealthCheck, LaunchSpec, ProcessProbe, ReadinessPolicy, RerankRequest,
//! };
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> probe_core::Result<()> {
//!     let spec = LaunchSpec::text_embeddings_router(
//!         "text-embeddings-router",
//!         "tomaarsen/Qwen3-Reranker-0.6B-seq-cls",
//!         "0.0.0.0",
//!         8081,
//!     );
//!     let request = RerankRequest::sample().to_probe_request("http://localhost:8081")?;
//!     let readiness = ReadinessPolicy::Poll(HealthCheck::new("http://localhost:8081/health"));
//!
//!     let report = ProcessProbe::new()?
//!         .run(&spec, &request, &readiness, Duration::from_secs(30), Duration::from_secs(5))
//!         .await?;
//!
//!     println!("{}", report.result.summary());
//!     std::process::exit(report.exit_code().into());
//! }
//! ```

pub mod config;
pub mod error;
pub mod platform;
pub mod probe;
pub mod process;
pub mod rerank;

// Re-export commonly used types
pub use config::{ProbeConfig, ReadinessConfig, RerankDefaults};
pub use error::{ProbeError, Result};
pub use probe::{
    Backoff, HealthCheck, ProbeOutcome, ProbeRequest, ProbeResult, ProcessProbe, Readiness,
    ReadinessPolicy, RunReport,
};
pub use process::{
    LaunchSpec, ManagedProcess, OutputLine, OutputLog, OutputStream, ProcessLauncher,
    ProcessState, Termination,
};
pub use rerank::{RankedText, RerankRequest};
