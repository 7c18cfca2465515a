// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-item errors carried inside records.
//!
//! A [`StructuredError`] is created by whichever component detects the fault
//! and is never mutated afterwards. Records only ever append them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure class of a per-item error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The item or group did not have the expected shape (no payload, wrong arity).
    InvalidInput,
    /// A post-processing stage found a required metadata field absent.
    MissingField,
    /// The item's payload ended with a source fault.
    PayloadTruncated,
    /// Writing a temporary copy of the payload failed.
    UpstreamUploadFailure,
    /// Promoting a temporary resource to permanent storage failed.
    UpstreamCopyFailure,
    /// Deleting a temporary resource failed.
    UpstreamDeleteFailure,
    /// The metadata extractor failed or answered for the wrong file.
    ExtractionFailure,
    /// The run was aborted before the item could be completed.
    Aborted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid-input",
            ErrorKind::MissingField => "missing-field",
            ErrorKind::PayloadTruncated => "payload-truncated",
            ErrorKind::UpstreamUploadFailure => "upstream-upload-failure",
            ErrorKind::UpstreamCopyFailure => "upstream-copy-failure",
            ErrorKind::UpstreamDeleteFailure => "upstream-delete-failure",
            ErrorKind::ExtractionFailure => "extraction-failure",
            ErrorKind::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable, per-item fault: `{kind, message}`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct StructuredError {
    kind: ErrorKind,
    message: String,
}

impl StructuredError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// One error per missing field, named after the stage that required it.
    pub fn missing_field(stage: &str, field: &str) -> Self {
        Self::new(
            ErrorKind::MissingField,
            format!("{} missing field metadata.{}", stage, field),
        )
    }
}
