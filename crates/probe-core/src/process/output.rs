//! Capture of child stdout/stderr for diagnostics.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Which stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// A single captured line, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stream.as_str(), self.line)
    }
}

#[derive(Debug)]
struct OutputBuffer {
    lines: VecDeque<OutputLine>,
    capacity: usize,
    dropped: usize,
}

/// Bounded tail of a process's output, shared with the draining tasks.
#[derive(Debug, Clone)]
pub struct OutputLog {
    inner: Arc<Mutex<OutputBuffer>>,
}

impl OutputLog {
    /// Create a log that keeps at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OutputBuffer {
                lines: VecDeque::with_capacity(capacity.min(1024)),
                capacity: capacity.max(1),
                dropped: 0,
            })),
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub fn push(&self, stream: OutputStream, line: impl Into<String>) {
        let mut buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if buffer.lines.len() == buffer.capacity {
            buffer.lines.pop_front();
            buffer.dropped += 1;
        }
        buffer.lines.push_back(OutputLine {
            stream,
            line: line.into(),
        });
    }

    /// Snapshot of the retained lines, oldest first.
    pub fn tail(&self) -> Vec<OutputLine> {
        let buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buffer.lines.iter().cloned().collect()
    }

    /// Last `n` retained lines, oldest first.
    pub fn last(&self, n: usize) -> Vec<OutputLine> {
        let buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let skip = buffer.lines.len().saturating_sub(n);
        buffer.lines.iter().skip(skip).cloned().collect()
    }

    /// Number of lines evicted to stay within capacity.
    pub fn dropped(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).dropped
    }

    /// Whether any retained line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        let buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buffer.lines.iter().any(|l| l.line.contains(needle))
    }
}

/// Shared handle to the optional on-disk copy of the output.
pub(crate) type LogSink = Arc<tokio::sync::Mutex<File>>;

/// Copy `reader` line by line into `log` (and `sink`) until EOF.
///
/// Both `\n` and `\r` end a line, so carriage-return progress bars become
/// separate entries. Lines longer than `max_line` bytes are split.
pub(crate) fn spawn_drain<R>(
    reader: R,
    stream: OutputStream,
    log: OutputLog,
    sink: Option<LogSink>,
    max_line: usize,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            let chunk = match reader.fill_buf().await {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug!("Stopped reading {}: {}", stream.as_str(), e);
                    break;
                }
            };
            if chunk.is_empty() {
                break;
            }

            let room = max_line.saturating_sub(buf.len()).max(1);
            let window = &chunk[..chunk.len().min(room)];
            let line_end = window.iter().position(|&b| b == b'\n' || b == b'\r');
            let (consumed, complete) = match line_end {
                Some(pos) => (pos + 1, true),
                None => (window.len(), buf.len() + window.len() >= max_line),
            };
            buf.extend_from_slice(&chunk[..consumed]);
            reader.consume(consumed);

            if complete {
                emit_line(&buf, stream, &log, sink.as_ref()).await;
                buf.clear();
            }
        }

        if !buf.is_empty() {
            emit_line(&buf, stream, &log, sink.as_ref()).await;
        }

        if let Some(sink) = sink {
            if let Err(e) = sink.lock().await.flush().await {
                warn!("Failed to flush log file: {}", e);
            }
        }
    })
}

async fn emit_line(raw: &[u8], stream: OutputStream, log: &OutputLog, sink: Option<&LogSink>) {
    if let Some(sink) = sink {
        let mut file = sink.lock().await;
        if let Err(e) = file.write_all(raw).await {
            warn!("Failed to write {} to log file: {}", stream.as_str(), e);
        }
    }

    let line = String::from_utf8_lossy(raw)
        .trim_end_matches(&['\r', '\n'][..])
        .to_string();
    // The `\n` of a `\r\n` pair arrives on its own
    if line.is_empty() {
        return;
    }
    trace!("{}: {}", stream.as_str(), line);
    log.push(stream, line);
}
