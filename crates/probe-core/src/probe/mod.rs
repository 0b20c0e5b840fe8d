//! Probing a launched server over HTTP.
//!
//! A probe is one request with a timeout. Its outcome is classified into a
//! [`ProbeOutcome`] rather than returned as an error, so cleanup always runs.

mod backoff;
mod client;
mod readiness;
mod request;
mod result;
mod runner;

pub use backoff::Backoff;
pub use readiness::{HealthCheck, Readiness, ReadinessPolicy};
pub use request::ProbeRequest;
pub use result::{ProbeOutcome, ProbeResult};
pub use runner::{ProcessProbe, RunReport};
