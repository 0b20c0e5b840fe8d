//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live here:
//! - `process` - signals and process-group termination
//! - `network` - local port checks

pub mod network;
pub mod process;

pub use network::{connectable_host, is_accepting};
pub use process::{is_process_alive, kill_group, request_terminate};
