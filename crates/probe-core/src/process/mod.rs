//! Process management module.
//!
//! Launches the server under test, captures its output, and guarantees it is
//! terminated exactly once.
//!
//! # Example
//!
//! ```rust,no_run
//! use probe_core::process::{LaunchSpec, ProcessLauncher};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> probe_core::Result<()> {
//!     let spec = LaunchSpec::new("sleep").with_arg("30");
//!     let mut process = ProcessLauncher::launch(&spec).await?;
//!
//!     let termination = process.stop(Duration::from_secs(5)).await?;
//!     println!("PID {} {}", process.pid(), termination);
//!     Ok(())
//! }
//! ```

mod launcher;
mod managed;
mod output;

pub use launcher::{LaunchSpec, ProcessLauncher};
pub use managed::{ManagedProcess, ProcessState, Termination};
pub use output::{OutputLine, OutputLog, OutputStream};
