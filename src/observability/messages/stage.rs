// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for post-processing stages and temporary-resource handling.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A stage skipped its primary action because required fields were absent.
///
/// # Log Level
/// `warn!` - Recoverable fault
///
/// # Example
/// ```
/// use stream_upload::observability::messages::stage::StageFieldsMissing;
///
/// let msg = StageFieldsMissing {
///     stage: "storage_local",
///     index: 0,
///     fields: &["filename"],
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct StageFieldsMissing<'a> {
    pub stage: &'a str,
    pub index: u64,
    pub fields: &'a [&'a str],
}

impl Display for StageFieldsMissing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' skipped item #{}: missing metadata fields [{}]",
            self.stage,
            self.index,
            self.fields.join(", ")
        )
    }
}

impl StructuredLog for StageFieldsMissing<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            index = self.index,
            missing = self.fields.len(),
            "{}", self
        );
    }
}

/// A stage ran its promote step.
///
/// # Log Level
/// `debug!` - Per-item detail
pub struct StagePromoting<'a> {
    pub stage: &'a str,
    pub index: u64,
}

impl Display for StagePromoting<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stage '{}' promoting item #{}", self.stage, self.index)
    }
}

impl StructuredLog for StagePromoting<'_> {
    fn log(&self) {
        tracing::debug!(stage = self.stage, index = self.index, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stage",
            span_name = name,
            stage = self.stage,
            index = self.index,
        )
    }
}

/// A storage call made by a stage failed and was recorded on the item.
///
/// # Log Level
/// `warn!` - Recoverable fault
pub struct StageCallFailed<'a> {
    pub stage: &'a str,
    pub index: u64,
    pub kind: &'a str,
    pub message: &'a str,
}

impl Display for StageCallFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' failed on item #{} ({}): {}",
            self.stage, self.index, self.kind, self.message
        )
    }
}

impl StructuredLog for StageCallFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            index = self.index,
            kind = self.kind,
            "{}", self
        );
    }
}

/// A temporary resource was deleted without being promoted.
///
/// # Log Level
/// `debug!` - Per-item detail
pub struct TempResourceReleased<'a> {
    pub stage: &'a str,
    pub index: u64,
}

impl Display for TempResourceReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' released the temporary resource of item #{}",
            self.stage, self.index
        )
    }
}

impl StructuredLog for TempResourceReleased<'_> {
    fn log(&self) {
        tracing::debug!(stage = self.stage, index = self.index, "{}", self);
    }
}

/// A storage directory was checked at startup.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DirectoryReady<'a> {
    pub role: &'a str,
    pub path: &'a std::path::Path,
    pub created: bool,
}

impl Display for DirectoryReady<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} directory '{}' is ready{}",
            self.role,
            self.path.display(),
            if self.created { " (created)" } else { "" }
        )
    }
}
