//! Extractor backed by an external process.
//!
//! One pump task per extraction reads stdout line by line, forwards decoded
//! events, collects the tail of stderr as the diagnostic and reaps the child.
//! Killing is polite first (SIGTERM on unix), forced after the grace period.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::ExtractorConfig;

use super::parse::parse_line;
use super::{
    ExtractRequest, Extractor, ExtractorError, ExtractorEvent, ExtractorHandle, VideoMetadata,
};

/// Decoded events buffered between the pump and the consumer.
const EVENT_BUFFER: usize = 64;
/// Bytes of stderr kept for the diagnostic (the tail, where the error usually is).
const STDERR_TAIL_BYTES: usize = 16 * 1024;

/// Spawns the configured extractor program for every request.
#[derive(Debug, Clone)]
pub struct ProcessExtractor {
    config: ExtractorConfig,
}

impl ProcessExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> ExtractorError {
        ExtractorError::Spawn {
            program: PathBuf::from(&self.config.program),
            source,
        }
    }
}

#[async_trait]
impl Extractor for ProcessExtractor {
    async fn info(&self, url: &str) -> Result<VideoMetadata, ExtractorError> {
        let mut cmd = self.command();
        cmd.arg("--info").arg(url);
        let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        // On timeout the child is dropped and kill_on_drop terminates it.
        let output =
            match tokio::time::timeout(self.config.info_timeout(), child.wait_with_output()).await
            {
                Ok(output) => output?,
                Err(_) => return Err(ExtractorError::Timeout(self.config.info_timeout_secs)),
            };

        if !output.status.success() {
            let diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(url, status = %output.status, "extractor info failed");
            return Err(ExtractorError::Failed {
                status: output.status.to_string(),
                diagnostic,
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn start(&self, request: &ExtractRequest) -> Result<ExtractorHandle, ExtractorError> {
        let mut cmd = self.command();
        cmd.arg("--download")
            .arg(self.config.watch_url(&request.video_id))
            .arg("--itag")
            .arg(request.format_id.to_string())
            .arg("--output")
            .arg(&request.output_stem);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ExtractorError::Io(std::io::Error::other("extractor stdout not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            ExtractorError::Io(std::io::Error::other("extractor stderr not captured"))
        })?;

        tracing::debug!(
            video_id = %request.video_id,
            format_id = request.format_id,
            pid = child.id(),
            "extractor started"
        );

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let kill = CancellationToken::new();
        tokio::spawn(pump(
            child,
            stdout,
            stderr,
            tx,
            kill.clone(),
            self.config.kill_grace(),
        ));
        Ok(ExtractorHandle::new(rx, kill))
    }
}

/// Drives one process to completion. Sends a final `Failure` on unsuccessful exit;
/// sends nothing further once killed.
async fn pump(
    mut child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    tx: mpsc::Sender<ExtractorEvent>,
    kill: CancellationToken,
    grace: Duration,
) {
    let stderr_task = tokio::spawn(collect_stderr(stderr));
    let mut lines = BufReader::new(stdout).lines();

    loop {
        tokio::select! {
            biased;
            _ = kill.cancelled() => {
                terminate(&mut child, grace).await;
                stderr_task.abort();
                return;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(event) = parse_line(&line) else {
                        continue;
                    };
                    if tx.send(event).await.is_err() {
                        // Consumer went away; nobody is left to report to.
                        terminate(&mut child, grace).await;
                        stderr_task.abort();
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("extractor stdout: {}", e);
                    break;
                }
            }
        }
    }

    let status = tokio::select! {
        biased;
        _ = kill.cancelled() => {
            terminate(&mut child, grace).await;
            stderr_task.abort();
            return;
        }
        status = child.wait() => status,
    };
    let diagnostic = stderr_task.await.unwrap_or_default();

    match status {
        Ok(status) if status.success() => {
            tracing::debug!("extractor exited cleanly");
        }
        Ok(status) => {
            let diagnostic = if diagnostic.is_empty() {
                format!("extractor exited with {}", status)
            } else {
                diagnostic
            };
            let _ = tx.send(ExtractorEvent::Failure { diagnostic }).await;
        }
        Err(e) => {
            let _ = tx
                .send(ExtractorEvent::Failure {
                    diagnostic: format!("failed to wait for extractor: {}", e),
                })
                .await;
        }
    }
}

/// Reads stderr to the end, keeping the last `STDERR_TAIL_BYTES`.
async fn collect_stderr(stderr: ChildStderr) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail: VecDeque<String> = VecDeque::new();
    let mut bytes = 0usize;
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "vdm_core::extractor::stderr", "{}", line);
        bytes += line.len() + 1;
        tail.push_back(line);
        while bytes > STDERR_TAIL_BYTES {
            match tail.pop_front() {
                Some(dropped) => bytes -= dropped.len() + 1,
                None => break,
            }
        }
    }
    tail.into_iter().collect::<Vec<_>>().join("\n").trim().to_string()
}

/// SIGTERM, wait up to `grace`, then SIGKILL and reap.
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: `pid` is our own child and has not been reaped (id() is Some).
        let r = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if r == 0 {
            if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                tracing::debug!(?status, "extractor exited after SIGTERM");
                return;
            }
        }
    }

    if let Err(e) = child.start_kill() {
        tracing::debug!("extractor kill: {}", e);
    }
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => tracing::debug!(?status, "extractor killed"),
        Err(_) => tracing::warn!(pid = child.id(), "extractor did not exit after SIGKILL"),
    }
}

#[cfg(all(test, unix))]
mod tests;
