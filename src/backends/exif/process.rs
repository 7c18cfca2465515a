// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Long-lived `exiftool -stay_open` worker.
//!
//! One child process serves every item of a run. Requests are serialised behind
//! a mutex: each writes its argument lines followed by `-execute`, then reads
//! stdout up to the `{ready}` sentinel. A worker that fails or times out is
//! killed and a fresh one is spawned on the next request.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::config::consts::{EXIFTOOL_ARGS, EXTRACT_TIMEOUT};
use crate::errors::ExtractError;
use crate::observability::messages::branch::{ExtractorFailed, ExtractorStarted, ExtractorStopped};
use crate::traits::MetadataExtractor;

const READY_SENTINEL: &str = "{ready}";

struct Worker {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Worker {
    async fn request(&mut self, path: &Path) -> Result<String, ExtractError> {
        let mut request = String::new();
        for arg in EXIFTOOL_ARGS {
            request.push_str(arg);
            request.push('\n');
        }
        request.push_str(&path.to_string_lossy());
        request.push_str("\n-execute\n");

        self.stdin.write_all(request.as_bytes()).await?;
        self.stdin.flush().await?;

        let mut answer = String::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line).await? == 0 {
                return Err(ExtractError::WorkerExited);
            }
            if line.trim_end() == READY_SENTINEL {
                return Ok(answer);
            }
            answer.push_str(&line);
        }
    }
}

pub struct ExiftoolProcess {
    program: String,
    timeout: Duration,
    worker: Mutex<Option<Worker>>,
}

impl ExiftoolProcess {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: EXTRACT_TIMEOUT,
            worker: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn spawn(&self) -> Result<Worker, ExtractError> {
        let spawn_error = |reason: String| ExtractError::Spawn {
            program: self.program.clone(),
            reason,
        };

        let mut child = Command::new(&self.program)
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout not captured".to_string()))?;

        tracing::info!(
            "{}",
            ExtractorStarted {
                program: &self.program,
                pid: child.id(),
            }
        );

        Ok(Worker {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

fn parse_answer(answer: &str) -> Result<Value, ExtractError> {
    let document: Value = serde_json::from_str(answer.trim()).map_err(|e| ExtractError::Parse(e.to_string()))?;
    match document {
        Value::Array(mut documents) if !documents.is_empty() => Ok(documents.swap_remove(0)),
        Value::Array(_) => Err(ExtractError::EmptyAnswer),
        other => Ok(other),
    }
}

#[async_trait]
impl MetadataExtractor for ExiftoolProcess {
    async fn extract(&self, path: &Path) -> Result<Value, ExtractError> {
        let mut slot = self.worker.lock().await;
        if slot.is_none() {
            *slot = Some(self.spawn()?);
        }
        let worker = slot.as_mut().ok_or(ExtractError::WorkerExited)?;

        let outcome = match tokio::time::timeout(self.timeout, worker.request(path)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ExtractError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(answer) => parse_answer(&answer),
            Err(error) => {
                tracing::warn!(
                    "{}",
                    ExtractorFailed {
                        program: &self.program,
                        error: &error,
                    }
                );
                if let Some(mut failed) = slot.take() {
                    let _ = failed.child.start_kill();
                }
                Err(error)
            }
        }
    }

    fn program(&self) -> &str {
        &self.program
    }

    async fn shutdown(&self) {
        let Some(mut worker) = self.worker.lock().await.take() else {
            return;
        };

        let stop = async {
            worker.stdin.write_all(b"-stay_open\nFalse\n").await?;
            worker.stdin.flush().await?;
            worker.child.wait().await
        };
        if tokio::time::timeout(self.timeout, stop).await.map_or(true, |r| r.is_err()) {
            let _ = worker.child.start_kill();
        }
        tracing::info!("{}", ExtractorStopped { program: &self.program });
    }
}
