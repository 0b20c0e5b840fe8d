//! Centralized defaults for the probe harness.
//!
//! Values here only seed builders and CLI defaults; nothing in the library
//! reads them implicitly once a caller has supplied its own.

use std::time::Duration;

/// Probe and cleanup timing.
pub struct ProbeConfig;

impl ProbeConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const STOP_GRACE: Duration = Duration::from_secs(5);
    pub const OUTPUT_TAIL_LINES: usize = 200;
    /// Longer output lines are split into several captured lines.
    pub const OUTPUT_LINE_MAX_BYTES: usize = 16 * 1024;
    pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);
    pub const USER_AGENT: &'static str = "probe-core/0.1";
}

/// Readiness wait defaults.
pub struct ReadinessConfig;

impl ReadinessConfig {
    /// Delay of the fixed-sleep readiness strategy.
    pub const FIXED_DELAY: Duration = Duration::from_secs(10);
    pub const DEADLINE: Duration = Duration::from_secs(120);
    pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);
    pub const INITIAL_INTERVAL: Duration = Duration::from_millis(250);
    pub const MAX_INTERVAL: Duration = Duration::from_secs(2);
    pub const HEALTH_PATH: &'static str = "/health";
}

/// Defaults for the text-embeddings router rerank smoke test.
pub struct RerankDefaults;

impl RerankDefaults {
    pub const PROGRAM: &'static str = "text-embeddings-router";
    pub const MODEL_ID: &'static str = "tomaarsen/Qwen3-Reranker-0.6B-seq-cls";
    pub const BIND_HOST: &'static str = "0.0.0.0";
    pub const CONNECT_HOST: &'static str = "localhost";
    pub const PORT: u16 = 8081;
    pub const RERANK_PATH: &'static str = "/rerank";
    pub const QUERY: &'static str = "What is deep learning?";
    pub const TEXTS: [&'static str; 4] = [
        "Deep learning is a subset of machine learning that uses neural networks.",
        "Machine learning is a field of artificial intelligence.",
        "Python is a programming language.",
        "Neural networks are computational models inspired by biological neural networks.",
    ];
    /// Number of ranked entries echoed in the success report.
    pub const REPORT_TOP_N: usize = 2;
    pub const REPORT_TEXT_CHARS: usize = 50;
}
