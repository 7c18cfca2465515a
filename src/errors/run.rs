// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run-level and payload-level errors.

use thiserror::Error;

/// Faults that stop the whole run.
///
/// Everything else is recovered into a record's `errors` list.
#[derive(Error, Debug)]
pub enum RunError {
    /// The source could not produce even the first item (malformed envelope).
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A branch did not produce exactly one result for an item.
    #[error("Branch '{branch}' broke its result contract for item #{index}: {reason}")]
    BranchContract {
        branch: String,
        index: u64,
        reason: String,
    },

    /// Writing to the output sink failed.
    #[error("Output sink failed: {0}")]
    Sink(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// A fault in one item's byte payload, seen by every branch sharing it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The source reported the payload ended early.
    #[error("Unexpected end of payload: {0}")]
    Truncated(String),

    /// The producer went away without finishing the payload.
    #[error("Payload source closed before the end of the item")]
    SourceDropped,
}
