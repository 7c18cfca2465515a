// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for branch execution and the metadata-extraction worker.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A branch reported per-item errors.
///
/// # Log Level
/// `warn!` - Recoverable fault
///
/// # Example
/// ```
/// use stream_upload::observability::messages::branch::BranchReportedErrors;
///
/// let msg = BranchReportedErrors {
///     branch: "exiftool",
///     index: 0,
///     messages: &["exiftool answered for the wrong file".to_string()],
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct BranchReportedErrors<'a> {
    pub branch: &'a str,
    pub index: u64,
    pub messages: &'a [String],
}

impl Display for BranchReportedErrors<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Branch '{}' reported {} error(s) for item #{}: {}",
            self.branch,
            self.messages.len(),
            self.index,
            self.messages.join("; ")
        )
    }
}

impl StructuredLog for BranchReportedErrors<'_> {
    fn log(&self) {
        tracing::warn!(
            branch = self.branch,
            index = self.index,
            error_count = self.messages.len(),
            "{}", self
        );
    }
}

/// A branch panicked instead of producing its result.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct BranchPanicked<'a> {
    pub branch: &'a str,
    pub index: u64,
    pub reason: &'a str,
}

impl Display for BranchPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Branch '{}' panicked on item #{}: {}",
            self.branch, self.index, self.reason
        )
    }
}

impl StructuredLog for BranchPanicked<'_> {
    fn log(&self) {
        tracing::error!(branch = self.branch, index = self.index, "{}", self);
    }
}

/// A branch outcome arrived during abort and could not be placed in its group.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct OutcomeDiscarded<'a> {
    pub branch: &'a str,
    pub index: u64,
    pub reason: &'a str,
}

impl Display for OutcomeDiscarded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discarded result of branch '{}' for item #{}: {}",
            self.branch, self.index, self.reason
        )
    }
}

impl StructuredLog for OutcomeDiscarded<'_> {
    fn log(&self) {
        tracing::debug!(branch = self.branch, index = self.index, "{}", self);
    }
}

/// The long-lived extraction worker was spawned.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExtractorStarted<'a> {
    pub program: &'a str,
    pub pid: Option<u32>,
}

impl Display for ExtractorStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.pid {
            Some(pid) => write!(f, "Started metadata extractor '{}' (pid {})", self.program, pid),
            None => write!(f, "Started metadata extractor '{}'", self.program),
        }
    }
}

/// The extraction worker failed and will be respawned for the next request.
///
/// # Log Level
/// `warn!` - Recoverable fault
pub struct ExtractorFailed<'a> {
    pub program: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ExtractorFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Metadata extractor '{}' failed, it will be restarted on next use: {}",
            self.program, self.error
        )
    }
}

/// The extraction worker was asked to exit.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExtractorStopped<'a> {
    pub program: &'a str,
}

impl Display for ExtractorStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stopped metadata extractor '{}'", self.program)
    }
}

/// A scratch file could not be removed.
///
/// # Log Level
/// `warn!` - Recoverable fault
pub struct ScratchCleanupFailed<'a> {
    pub path: &'a std::path::Path,
    pub error: &'a dyn std::error::Error,
}

impl Display for ScratchCleanupFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to remove scratch file '{}': {}",
            self.path.display(),
            self.error
        )
    }
}
