// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the metadata-extraction worker.
///
/// Carries rendered messages rather than source errors so a failed answer can be
/// cloned to every waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Failed to start '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("Worker I/O failed: {0}")]
    Io(String),

    #[error("Worker exited before answering")]
    WorkerExited,

    #[error("No answer within {0:?}")]
    Timeout(Duration),

    #[error("Unreadable answer: {0}")]
    Parse(String),

    #[error("Answer contained no document")]
    EmptyAnswer,

    #[error("Answer is for '{actual}', expected '{}'", expected.display())]
    IdentityMismatch { expected: PathBuf, actual: String },

    #[error("Failed to write scratch file '{}': {reason}", path.display())]
    Scratch { path: PathBuf, reason: String },
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        ExtractError::Io(err.to_string())
    }
}
