//! Human-readable rendering of a run.

use probe_core::rerank::parse_ranking;
use probe_core::{OutputLog, ProbeOutcome, RerankDefaults, RunReport};
use serde_json::Value;
use std::io::{self, Write};

/// Lines of server output shown after a failure.
const FAILURE_OUTPUT_LINES: usize = 20;

/// Write the report for `report` to `out`.
pub fn write_report(out: &mut impl Write, report: &RunReport) -> io::Result<()> {
    let result = &report.result;
    if result.outcome == ProbeOutcome::Success {
        writeln!(out, "Reranking successful!")?;
        if let Some(body) = &result.body {
            write_success_body(out, body)?;
        }
    } else {
        writeln!(out, "Reranking failed: {}", result.outcome)?;
        if let Some(status) = result.status {
            writeln!(out, "Status: {}", status)?;
        }
        if let Some(raw) = &result.raw_body {
            writeln!(out, "Response: {}", raw)?;
        }
        if let Some(error) = &result.error {
            writeln!(out, "Error: {}", error)?;
        }
        write_output_tail(out, &report.output)?;
    }

    match &report.termination {
        Some(termination) => writeln!(out, "Server {}.", termination)?,
        None => writeln!(out, "Server cleanup failed (pid {}).", report.pid)?,
    }
    Ok(())
}

fn write_success_body(out: &mut impl Write, body: &Value) -> io::Result<()> {
    let Some(ranking) = parse_ranking(body) else {
        return writeln!(out, "Response: {}", body);
    };

    writeln!(out, "Number of results: {}", ranking.len())?;
    for (i, rank) in ranking.iter().take(RerankDefaults::REPORT_TOP_N).enumerate() {
        let text = rank.text.as_deref().unwrap_or("");
        writeln!(
            out,
            "  {}. Score: {:.4}, Text: {}...",
            i + 1,
            rank.score,
            truncate(text, RerankDefaults::REPORT_TEXT_CHARS)
        )?;
    }
    Ok(())
}

fn write_output_tail(out: &mut impl Write, output: &OutputLog) -> io::Result<()> {
    let lines = output.last(FAILURE_OUTPUT_LINES);
    if lines.is_empty() {
        return Ok(());
    }
    writeln!(out, "Server output (last {} lines):", lines.len())?;
    if output.dropped() > 0 {
        writeln!(out, "  ({} earlier lines discarded)", output.dropped())?;
    }
    for line in &lines {
        writeln!(out, "  {}", line)?;
    }
    Ok(())
}

/// First `max_chars` characters of `text`.
fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
