//! Mock Rerank Server - stand-in for a text-embeddings router.
//!
//! Accepts the router's `--model-id/--port/--hostname` flags, serves
//! `GET /health` and `POST /rerank` with a canned response, and exits on
//! SIGTERM or Ctrl-C.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "mock-rerank-server")]
#[command(about = "Serve a canned /rerank response for smoke tests")]
struct Args {
    /// Model name reported by /health
    #[arg(long, default_value = "mock-reranker")]
    model_id: String,

    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "8081")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// HTTP status returned by /rerank
    #[arg(long, default_value_t = 200)]
    status: u16,

    /// JSON body returned by /rerank
    #[arg(long, default_value = r#"{"status":"ready"}"#)]
    response: String,

    /// Wait this long before binding the port
    #[arg(long, default_value_t = 0)]
    startup_delay_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

struct Canned {
    model_id: String,
    status: StatusCode,
    body: Value,
}

async fn health(State(canned): State<Arc<Canned>>) -> Json<Value> {
    Json(json!({"status": "ok", "model_id": canned.model_id}))
}

async fn rerank(
    State(canned): State<Arc<Canned>>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let texts = request["texts"].as_array().map(Vec::len).unwrap_or(0);
    info!("Rerank request with {} texts", texts);
    (canned.status, Json(canned.body.clone()))
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let status = StatusCode::from_u16(args.status)
        .with_context(|| format!("Invalid status code {}", args.status))?;
    let body: Value = serde_json::from_str(&args.response).context("--response is not JSON")?;
    let canned = Arc::new(Canned {
        model_id: args.model_id.clone(),
        status,
        body,
    });

    if args.startup_delay_ms > 0 {
        info!("Simulating model load for {}ms", args.startup_delay_ms);
        tokio::time::sleep(Duration::from_millis(args.startup_delay_ms)).await;
    }

    let app = Router::new()
        .route("/health", get(health))
        .route("/rerank", post(rerank))
        .with_state(canned);

    let listener = TcpListener::bind((args.hostname.as_str(), args.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", args.hostname, args.port))?;
    let addr = listener.local_addr()?;

    // Parsed by tests waiting for the server
    println!("listening on {}", addr);
    info!("Serving {} on {}", args.model_id, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown signal received, exiting");
    Ok(())
}
