//! Single-shot HTTP execution and outcome classification.

use super::request::ProbeRequest;
use super::result::ProbeResult;
use reqwest::Client;
use serde_json::Value;
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Send `request` exactly once and classify what happened.
pub(crate) async fn execute(
    client: &Client,
    request: &ProbeRequest,
    timeout: Duration,
) -> ProbeResult {
    let started = Instant::now();

    let url = match url::Url::parse(request.url()) {
        Ok(url) => url,
        Err(e) => {
            return ProbeResult::transport_error(
                format!("invalid URL {}: {}", request.url(), e),
                started.elapsed(),
            )
        }
    };

    info!("Probing {} {} (timeout: {:?})", request.method(), url, timeout);

    let mut builder = client.request(request.method().clone(), url).timeout(timeout);
    for (name, value) in request.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = request.body() {
        builder = builder.json(body);
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e, None, timeout, started),
    };

    let status = response.status();
    debug!("Response status {} after {:?}", status, started.elapsed());

    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return classify_error(&e, Some(status.as_u16()), timeout, started),
    };

    if !status.is_success() {
        warn!("Request failed with status {}", status);
        return ProbeResult::http_failure(status.as_u16(), text, None, started.elapsed());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(body) => ProbeResult::success(status.as_u16(), body, started.elapsed()),
        Err(e) => {
            warn!("Status {} but body is not JSON: {}", status, e);
            ProbeResult::http_failure(
                status.as_u16(),
                text,
                Some(format!("response body is not valid JSON: {}", e)),
                started.elapsed(),
            )
        }
    }
}

fn classify_error(
    err: &reqwest::Error,
    status: Option<u16>,
    timeout: Duration,
    started: Instant,
) -> ProbeResult {
    let message = error_chain(err);
    if err.is_timeout() {
        warn!("No response within {:?}", timeout);
        ProbeResult::timeout(
            format!("no response within {:?}", timeout),
            status,
            started.elapsed(),
        )
    } else {
        warn!("Transport error: {}", message);
        ProbeResult::transport_error(message, started.elapsed())
    }
}

/// Render an error with its sources, since reqwest's own message omits the cause.
pub(crate) fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
