//! In-process extractor that replays scripted steps instead of spawning a process.
//!
//! Each `start` pops the next queued script (or reuses the default one) and
//! plays it on a task, honouring `kill` between and during steps.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use super::{
    ExtractRequest, ExtractResult, Extractor, ExtractorError, ExtractorEvent, ExtractorHandle,
    VideoMetadata,
};

#[derive(Debug, Clone)]
pub enum Step {
    Progress(u8),
    /// Append `n` bytes to the partial file `<stem>.part`.
    Append(usize),
    /// Write `content` to `<stem>.<format>` and emit a result pointing at it.
    Finish {
        title: String,
        format: String,
        content: Vec<u8>,
    },
    /// Emit a result naming a file that is never written.
    ResultWithoutFile { title: String, format: String },
    /// Emit a failure (the process exited non-zero).
    Fail(String),
    Sleep(Duration),
    /// Block until the gate is notified.
    Wait(Arc<Notify>),
    /// Never finish; only a kill ends the run.
    Hang,
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: Vec<Step>,
    start_error: Option<String>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            start_error: None,
        }
    }

    /// A script whose process cannot be spawned.
    pub fn start_error(message: impl Into<String>) -> Self {
        Self {
            steps: Vec::new(),
            start_error: Some(message.into()),
        }
    }

    /// Progress 10/40/90 then a finished `mp4` titled `title`.
    pub fn success(title: &str) -> Self {
        Self::new(vec![
            Step::Progress(10),
            Step::Progress(40),
            Step::Progress(90),
            Step::Finish {
                title: title.to_string(),
                format: "mp4".to_string(),
                content: b"not really a video".to_vec(),
            },
        ])
    }
}

#[derive(Default)]
pub struct ScriptedExtractor {
    queue: Mutex<VecDeque<Script>>,
    default_script: Script,
    info: Mutex<Option<Result<VideoMetadata, String>>>,
    started: Mutex<Vec<ExtractRequest>>,
    kills: Arc<AtomicUsize>,
}

impl ScriptedExtractor {
    /// Every run plays `script` unless another one is queued.
    pub fn new(script: Script) -> Self {
        Self {
            default_script: script,
            ..Self::default()
        }
    }

    /// Queue a script for the next `start`.
    pub fn push(&self, script: Script) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(script);
    }

    /// Answer `info` with `result` (Err = extractor failure diagnostic).
    pub fn set_info(&self, result: Result<VideoMetadata, String>) {
        *self.info.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
    }

    /// Requests seen by `start`, in order.
    pub fn started(&self) -> Vec<ExtractRequest> {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of runs that were ended by a kill.
    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn info(&self, _url: &str) -> Result<VideoMetadata, ExtractorError> {
        let answer = self
            .info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match answer {
            Some(Ok(meta)) => Ok(meta),
            Some(Err(diagnostic)) => Err(ExtractorError::Failed {
                status: "exit status: 1".to_string(),
                diagnostic,
            }),
            None => Err(ExtractorError::Failed {
                status: "exit status: 1".to_string(),
                diagnostic: "no info scripted".to_string(),
            }),
        }
    }

    async fn start(&self, request: &ExtractRequest) -> Result<ExtractorHandle, ExtractorError> {
        let script = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone());

        if let Some(message) = script.start_error {
            return Err(ExtractorError::Spawn {
                program: "scripted".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message),
            });
        }

        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let (tx, rx) = mpsc::channel(16);
        let kill = CancellationToken::new();
        tokio::spawn(play(
            script.steps,
            request.clone(),
            tx,
            kill.clone(),
            Arc::clone(&self.kills),
        ));
        Ok(ExtractorHandle::new(rx, kill))
    }
}

async fn play(
    steps: Vec<Step>,
    request: ExtractRequest,
    tx: mpsc::Sender<ExtractorEvent>,
    kill: CancellationToken,
    kills: Arc<AtomicUsize>,
) {
    for step in steps {
        if kill.is_cancelled() {
            break;
        }
        let event = match step {
            Step::Progress(percent) => ExtractorEvent::Progress { percent },
            Step::Append(n) => {
                let path = request.output_stem.with_extension("part");
                match append(&path, n).await {
                    Ok(()) => continue,
                    Err(e) => ExtractorEvent::Failure {
                        diagnostic: format!("append {}: {}", path.display(), e),
                    },
                }
            }
            Step::Finish {
                title,
                format,
                content,
            } => {
                let path = request.output_stem.with_extension(&format);
                if let Err(e) = tokio::fs::write(&path, &content).await {
                    ExtractorEvent::Failure {
                        diagnostic: format!("write {}: {}", path.display(), e),
                    }
                } else {
                    ExtractorEvent::Result(ExtractResult {
                        title,
                        author: "Scripted Author".to_string(),
                        thumbnail: "https://img.example/t.jpg".to_string(),
                        quality: "360p".to_string(),
                        format,
                        size: format!("{} B", content.len()),
                        file_path: path,
                    })
                }
            }
            Step::ResultWithoutFile { title, format } => ExtractorEvent::Result(ExtractResult {
                title,
                author: String::new(),
                thumbnail: String::new(),
                quality: "360p".to_string(),
                file_path: request.output_stem.with_extension(&format),
                format,
                size: String::new(),
            }),
            Step::Fail(diagnostic) => ExtractorEvent::Failure { diagnostic },
            Step::Sleep(d) => {
                tokio::select! {
                    _ = kill.cancelled() => break,
                    _ = tokio::time::sleep(d) => continue,
                }
            }
            Step::Wait(gate) => {
                tokio::select! {
                    _ = kill.cancelled() => break,
                    _ = gate.notified() => continue,
                }
            }
            Step::Hang => {
                kill.cancelled().await;
                break;
            }
        };
        if tx.send(event).await.is_err() {
            return;
        }
    }
    if kill.is_cancelled() {
        kills.fetch_add(1, Ordering::SeqCst);
    }
}

async fn append(path: &std::path::Path, n: usize) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&vec![0u8; n]).await?;
    file.flush().await
}
