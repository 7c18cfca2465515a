// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::backends::stages::{required_str, FilenamePolicy};
use crate::errors::{ErrorKind, StorageError, StructuredError};
use crate::observability::messages::branch::ScratchCleanupFailed;
use crate::traits::PostStage;
use crate::types::{fields, Metadata};

/// Moves the scratch file written by `storage_temp_local` into `dir`.
pub struct LocalStorageStage {
    dir: PathBuf,
    policy: FilenamePolicy,
}

impl LocalStorageStage {
    pub fn new(dir: impl Into<PathBuf>, policy: FilenamePolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
        }
    }

    /// Rename, falling back to copy + remove when the scratch file lives on another device.
    async fn move_file(from: &Path, to: &Path) -> Result<(), StorageError> {
        if tokio::fs::rename(from, to).await.is_ok() {
            return Ok(());
        }

        tokio::fs::copy(from, to).await.map_err(|source| StorageError::File {
            action: "Copy to",
            path: to.to_path_buf(),
            source,
        })?;
        if let Err(error) = tokio::fs::remove_file(from).await {
            tracing::warn!("{}", ScratchCleanupFailed { path: from, error: &error });
        }
        Ok(())
    }
}

#[async_trait]
impl PostStage for LocalStorageStage {
    fn name(&self) -> &'static str {
        "storage_local"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &[fields::FILENAME, fields::LOCAL_TMP_FILEPATH]
    }

    fn temp_fields(&self) -> &'static [&'static str] {
        &[fields::LOCAL_TMP_FILEPATH]
    }

    async fn promote(&self, metadata: &Metadata) -> Result<Metadata, StructuredError> {
        let scratch = PathBuf::from(required_str(self.name(), metadata, fields::LOCAL_TMP_FILEPATH)?);
        let filename = self.policy.filename_for(metadata);
        let target = self.dir.join(&filename);

        Self::move_file(&scratch, &target)
            .await
            .map_err(|e| e.into_record_error(self.name(), ErrorKind::UpstreamCopyFailure))?;

        Ok([
            (fields::STORAGE_LOCAL_FILENAME, json!(filename)),
            (
                fields::STORAGE_LOCAL_FILEPATH,
                json!(target.to_string_lossy().to_string()),
            ),
        ]
        .into_iter()
        .collect())
    }

    async fn release(&self, metadata: &Metadata) -> Result<(), StructuredError> {
        let scratch = PathBuf::from(required_str(self.name(), metadata, fields::LOCAL_TMP_FILEPATH)?);
        match tokio::fs::remove_file(&scratch).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::File {
                action: "Remove",
                path: scratch,
                source,
            }
            .into_record_error(self.name(), ErrorKind::UpstreamDeleteFailure)),
        }
    }

    fn promote_consumes_temp(&self) -> bool {
        true
    }
}
