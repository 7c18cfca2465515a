// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the pipeline run lifecycle.
//!
//! This module contains message types for logging events related to:
//! * Run start, completion and abort
//! * Item intake from the source
//! * Output encoding

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Pipeline run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use stream_upload::observability::messages::pipeline::RunStarted;
///
/// let msg = RunStarted {
///     branches: &["payload_status", "file_hash"],
///     stages: &[],
///     post_concurrency: 1,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunStarted<'a> {
    pub branches: &'a [&'a str],
    pub stages: &'a [&'a str],
    pub post_concurrency: usize,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting upload pipeline: branches=[{}], stages=[{}], post_concurrency={}",
            self.branches.join(", "),
            self.stages.join(", "),
            self.post_concurrency
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            branch_count = self.branches.len(),
            stage_count = self.stages.len(),
            post_concurrency = self.post_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_run",
            span_name = name,
            branch_count = self.branches.len(),
            stage_count = self.stages.len(),
        )
    }
}

/// Pipeline run finished and the output array was closed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunCompleted {
    pub items: u64,
    pub records_with_errors: u64,
    pub duration: Duration,
}

impl Display for RunCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Upload pipeline completed: {} items, {} with errors, in {:?}",
            self.items, self.records_with_errors, self.duration
        )
    }
}

impl StructuredLog for RunCompleted {
    fn log(&self) {
        tracing::info!(
            items = self.items,
            records_with_errors = self.records_with_errors,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }
}

/// A fatal error stopped the run.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use stream_upload::observability::messages::pipeline::RunAborted;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "boundary not found");
/// let msg = RunAborted {
///     error: &error,
///     cleanup_records: 2,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct RunAborted<'a> {
    pub error: &'a dyn std::error::Error,
    pub cleanup_records: usize,
}

impl Display for RunAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Upload pipeline aborted: {} ({} unfinished records sent through cleanup)",
            self.error, self.cleanup_records
        )
    }
}

impl StructuredLog for RunAborted<'_> {
    fn log(&self) {
        tracing::error!(
            error = %self.error,
            cleanup_records = self.cleanup_records,
            "{}", self
        );
    }
}

/// The source accepted a new item and its payload is being fanned out.
///
/// # Log Level
/// `debug!` - Per-item detail
pub struct ItemAccepted<'a> {
    pub index: u64,
    pub filename: Option<&'a str>,
    pub has_payload: bool,
}

impl Display for ItemAccepted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Item #{} accepted: filename={}, payload={}",
            self.index,
            self.filename.unwrap_or("<none>"),
            self.has_payload
        )
    }
}

impl StructuredLog for ItemAccepted<'_> {
    fn log(&self) {
        tracing::debug!(
            index = self.index,
            filename = self.filename,
            has_payload = self.has_payload,
            "{}", self
        );
    }
}

/// The source failed after at least one item; the sequence ends there.
///
/// # Log Level
/// `warn!` - Recoverable fault
pub struct SourceEndedEarly<'a> {
    pub items: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for SourceEndedEarly<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Item source failed after {} items, ending the sequence: {}",
            self.items, self.error
        )
    }
}

impl StructuredLog for SourceEndedEarly<'_> {
    fn log(&self) {
        tracing::warn!(items = self.items, error = %self.error, "{}", self);
    }
}

/// A record was written to the output sink.
///
/// # Log Level
/// `debug!` - Per-item detail
pub struct RecordEncoded {
    pub index: u64,
    pub error_count: usize,
    pub bytes: usize,
}

impl Display for RecordEncoded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Record #{} encoded: {} bytes, {} errors",
            self.index, self.bytes, self.error_count
        )
    }
}

impl StructuredLog for RecordEncoded {
    fn log(&self) {
        tracing::debug!(
            index = self.index,
            bytes = self.bytes,
            error_count = self.error_count,
            "{}", self
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_started_lists_components_in_order() {
        let msg = RunStarted {
            branches: &["payload_status", "file_size"],
            stages: &["storage_local"],
            post_concurrency: 2,
        };
        assert_eq!(
            msg.to_string(),
            "Starting upload pipeline: branches=[payload_status, file_size], stages=[storage_local], post_concurrency=2"
        );
    }

    #[test]
    fn item_accepted_without_filename() {
        let msg = ItemAccepted {
            index: 3,
            filename: None,
            has_payload: false,
        };
        assert_eq!(msg.to_string(), "Item #3 accepted: filename=<none>, payload=false");
    }
}
