//! Cluster health watcher.
//!
//! Runs the long-lived health stream (`ceph -w`) and forwards every line of
//! its standard output and standard error while both are open.
//!
//! ```text
//!             ┌── stdout reader ──┐
//! ceph -w ────┤                   ├──→ LineSink
//!             └── stderr reader ──┘
//!                       │
//!        both at EOF → wait for exit status
//! ```
//!
//! Lines are forwarded whatever their encoding; invalid UTF-8 is replaced,
//! never fatal. Each reader stops at end-of-stream or on an I/O error. The watch returns once both readers are done and the process
//! has exited, so under normal operation it blocks for as long as the
//! cluster runs.

use crate::command::Invocation;
use cncore_shared::errors::{CncoreError, CncoreResult};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;

/// Which output channel a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Destination for forwarded lines.
pub trait LineSink: Send + Sync {
    fn forward(&self, stream: StreamKind, line: &str);
}

/// Prints every line on our own standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn forward(&self, _stream: StreamKind, line: &str) {
        println!("{}", line);
    }
}

/// Lines forwarded per stream once the watched process ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub stdout_lines: usize,
    pub stderr_lines: usize,
}

/// The cluster health stream command.
pub fn health_invocation() -> Invocation {
    Invocation::new("ceph").arg("-w")
}

/// Watch the cluster health stream until it exits.
pub async fn watch_health(
    invocation: &Invocation,
    sink: Arc<dyn LineSink>,
) -> CncoreResult<WatchSummary> {
    tracing::info!("init: running ceph health watcher");
    watch_process(invocation, sink).await
}

/// Run `invocation`, draining both output streams concurrently into `sink`.
///
/// Fails if the process cannot be launched or exits unsuccessfully after
/// both streams have drained.
pub async fn watch_process(
    invocation: &Invocation,
    sink: Arc<dyn LineSink>,
) -> CncoreResult<WatchSummary> {
    let mut cmd = invocation.to_tokio();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        CncoreError::Stream(format!("failed to launch [{}]: {}", invocation, e))
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CncoreError::Internal("stdout was not piped".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| CncoreError::Internal("stderr was not piped".into()))?;

    let stdout_reader = tokio::spawn(drain(stdout, StreamKind::Stdout, Arc::clone(&sink)));
    let stderr_reader = tokio::spawn(drain(stderr, StreamKind::Stderr, Arc::clone(&sink)));

    let (stdout_lines, stderr_lines) = tokio::join!(stdout_reader, stderr_reader);
    let summary = WatchSummary {
        stdout_lines: stdout_lines
            .map_err(|e| CncoreError::Internal(format!("stdout reader panicked: {}", e)))?,
        stderr_lines: stderr_lines
            .map_err(|e| CncoreError::Internal(format!("stderr reader panicked: {}", e)))?,
    };

    let status = child.wait().await.map_err(|e| {
        CncoreError::Stream(format!("failed to wait for [{}]: {}", invocation, e))
    })?;

    tracing::debug!(
        command = %invocation,
        %status,
        stdout_lines = summary.stdout_lines,
        stderr_lines = summary.stderr_lines,
        "Watched process exited"
    );

    if !status.success() {
        return Err(CncoreError::Stream(format!(
            "[{}] exited with {}",
            invocation, status
        )));
    }

    Ok(summary)
}

/// Forward lines until end-of-stream or an I/O error.
async fn drain<R>(reader: R, stream: StreamKind, sink: Arc<dyn LineSink>) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut lines = SplitStream::new(BufReader::new(reader).split(b'\n'));
    let mut forwarded = 0;

    while let Some(next) = lines.next().await {
        let raw = match next {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(?stream, error = %e, "Stopped reading health stream");
                break;
            }
        };
        let line = raw.strip_suffix(b"\r").unwrap_or(&raw);
        sink.forward(stream, &String::from_utf8_lossy(line));
        forwarded += 1;
    }

    forwarded
}
