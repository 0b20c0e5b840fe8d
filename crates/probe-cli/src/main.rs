//! Rerank Probe - smoke test for a text-embeddings router.
//!
//! Starts the router, waits until it is ready, sends one `POST /rerank`,
//! reports the result and always stops the server. Exits 0 only on success.

mod report;

use anyhow::{bail, Context, Result};
use clap::Parser;
use probe_core::rerank::base_url;
use probe_core::{
    HealthCheck, LaunchSpec, ProbeConfig, ProcessProbe, ReadinessConfig, ReadinessPolicy,
    RerankDefaults, RerankRequest,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "rerank-probe")]
#[command(about = "Launch a reranking server, probe /rerank once, and stop it")]
struct Args {
    /// Server executable
    #[arg(long, default_value = RerankDefaults::PROGRAM)]
    program: PathBuf,

    /// Model served by the router
    #[arg(long, default_value = RerankDefaults::MODEL_ID)]
    model_id: String,

    /// Host the server binds to
    #[arg(long, default_value = RerankDefaults::BIND_HOST)]
    hostname: String,

    /// Host the probe connects to
    #[arg(long, default_value = RerankDefaults::CONNECT_HOST)]
    connect_host: String,

    /// Port the server listens on
    #[arg(short, long, default_value_t = RerankDefaults::PORT)]
    port: u16,

    /// Extra argument passed to the server (repeatable)
    #[arg(long = "server-arg", allow_hyphen_values = true)]
    server_args: Vec<String>,

    /// Extra environment variable for the server, as KEY=VALUE (repeatable)
    #[arg(long = "env", value_parser = parse_env_var)]
    env_vars: Vec<(String, String)>,

    /// Rerank query
    #[arg(long, default_value = RerankDefaults::QUERY)]
    query: String,

    /// Candidate text (repeatable; defaults to the built-in sample)
    #[arg(long = "text")]
    texts: Vec<String>,

    /// Ask the server for raw scores
    #[arg(long)]
    raw_scores: bool,

    /// Do not ask the server to echo texts back
    #[arg(long)]
    no_return_text: bool,

    /// Sleep instead of polling the health endpoint (10s without a value)
    #[arg(long, value_name = "SECS", num_args = 0..=1)]
    fixed_delay_secs: Option<Option<u64>>,

    /// Health endpoint polled for readiness
    #[arg(long, default_value = ReadinessConfig::HEALTH_PATH)]
    health_path: String,

    /// Give up waiting for readiness after this many seconds
    #[arg(long, default_value_t = ReadinessConfig::DEADLINE.as_secs())]
    ready_timeout_secs: u64,

    /// Timeout of the rerank request in seconds
    #[arg(long, default_value_t = ProbeConfig::REQUEST_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Seconds to wait after SIGTERM before killing the server
    #[arg(long, default_value_t = ProbeConfig::STOP_GRACE.as_secs())]
    grace_secs: u64,

    /// Also write server output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn launch_spec(&self) -> LaunchSpec {
        let mut spec = LaunchSpec::text_embeddings_router(
            &self.program,
            &self.model_id,
            &self.hostname,
            self.port,
        )
        .with_args(&self.server_args);
        for (key, value) in &self.env_vars {
            spec = spec.with_env(key, value);
        }
        if let Some(ref log_file) = self.log_file {
            spec = spec.with_log_file(log_file);
        }
        spec
    }

    fn rerank_request(&self) -> RerankRequest {
        let request = if self.texts.is_empty() {
            RerankRequest::sample()
        } else {
            RerankRequest::new(&self.query, &self.texts)
        };
        RerankRequest {
            query: self.query.clone(),
            ..request
        }
        .with_raw_scores(self.raw_scores)
        .with_return_text(!self.no_return_text)
    }

    fn readiness_policy(&self, base_url: &str) -> ReadinessPolicy {
        match self.fixed_delay_secs {
            Some(Some(secs)) => ReadinessPolicy::FixedDelay(Duration::from_secs(secs)),
            Some(None) => ReadinessPolicy::fixed_default(),
            None => ReadinessPolicy::Poll(
                HealthCheck::new(format!("{}{}", base_url, self.health_path))
                    .with_deadline(Duration::from_secs(self.ready_timeout_secs)),
            ),
        }
    }
}

fn parse_env_var(s: &str) -> Result<(String, String)> {
    let Some((key, value)) = s.split_once('=') else {
        bail!("expected KEY=VALUE, got '{}'", s);
    };
    if key.is_empty() {
        bail!("empty variable name in '{}'", s);
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging; RUST_LOG overrides --debug
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(&args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<u8> {
    let base_url = base_url(&args.connect_host, args.port);
    let spec = args.launch_spec();
    let request = args.rerank_request().to_probe_request(&base_url)?;
    let readiness = args.readiness_policy(&base_url);

    info!("Probing {} served by {}", args.model_id, spec.program_name());

    let report = ProcessProbe::new()?
        .run(
            &spec,
            &request,
            &readiness,
            Duration::from_secs(args.timeout_secs),
            Duration::from_secs(args.grace_secs),
        )
        .await
        .with_context(|| format!("Failed to launch {}", spec.command_line()))?;

    let mut stdout = std::io::stdout().lock();
    report::write_report(&mut stdout, &report).context("Failed to write report")?;

    Ok(report.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rerank-probe").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);

        assert_eq!(args.port, 8081);
        assert_eq!(args.hostname, "0.0.0.0");
        assert_eq!(args.ready_timeout_secs, 120);
        assert_eq!(args.timeout_secs, 30);
        assert_eq!(args.grace_secs, 5);
        assert_eq!(args.rerank_request(), RerankRequest::sample());
        assert_eq!(
            args.launch_spec().args(),
            [
                "--model-id",
                RerankDefaults::MODEL_ID,
                "--port",
                "8081",
                "--hostname",
                "0.0.0.0"
            ]
        );
    }

    #[test]
    fn test_server_args_and_env() {
        let args = parse(&[
            "--server-arg",
            "--max-batch-tokens",
            "--server-arg",
            "4096",
            "--env",
            "CUDA_VISIBLE_DEVICES=0",
        ]);
        let spec = args.launch_spec();

        assert_eq!(&spec.args()[6..], ["--max-batch-tokens", "4096"]);
        assert_eq!(
            spec.env_vars().get("CUDA_VISIBLE_DEVICES").map(String::as_str),
            Some("0")
        );
    }

    #[test]
    fn test_custom_request() {
        let args = parse(&["--query", "q", "--text", "a", "--text", "b", "--no-return-text"]);
        let request = args.rerank_request();

        assert_eq!(request.query, "q");
        assert_eq!(request.texts, ["a", "b"]);
        assert!(!request.return_text);
        assert!(!request.raw_scores);
    }

    #[test]
    fn test_custom_query_keeps_sample_texts() {
        let request = parse(&["--query", "What is Rust?"]).rerank_request();

        assert_eq!(request.query, "What is Rust?");
        assert_eq!(request.texts.len(), 4);
    }

    #[test]
    fn test_readiness_policy() {
        let poll = parse(&["--health-path", "/ready"]).readiness_policy("http://localhost:8081");
        match poll {
            ReadinessPolicy::Poll(check) => assert_eq!(check.url, "http://localhost:8081/ready"),
            other => panic!("expected Poll, got {:?}", other),
        }

        let fixed = parse(&["--fixed-delay-secs", "3"]).readiness_policy("http://x");
        assert!(matches!(
            fixed,
            ReadinessPolicy::FixedDelay(d) if d == Duration::from_secs(3)
        ));
    }

    #[test]
    fn test_fixed_delay_without_value_uses_default() {
        let fixed = parse(&["--fixed-delay-secs", "--port", "9000"]).readiness_policy("http://x");

        assert!(matches!(
            fixed,
            ReadinessPolicy::FixedDelay(d) if d == ReadinessConfig::FIXED_DELAY
        ));
    }

    #[test]
    fn test_parse_env_var() {
        assert_eq!(
            parse_env_var("A=b=c").unwrap(),
            ("A".to_string(), "b=c".to_string())
        );
        assert!(parse_env_var("novalue").is_err());
        assert!(parse_env_var("=x").is_err());
    }
}
