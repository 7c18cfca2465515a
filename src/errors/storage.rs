// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

use crate::errors::{ErrorKind, StructuredError};

/// Failures of the persistence calls made by post-processing stages.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{action} '{}' failed: {source}", path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{action} '{bucket}/{key}' failed: {source}")]
    Object {
        action: &'static str,
        bucket: String,
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("No configured store holds bucket '{0}'")]
    UnknownBucket(String),
}

impl StorageError {
    /// Render as a record error of the given kind, prefixed with the stage name.
    pub fn into_record_error(self, stage: &str, kind: ErrorKind) -> StructuredError {
        StructuredError::new(kind, format!("{}: {}", stage, self))
    }
}
