// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::backends::branches::no_payload;
use crate::engine::broadcast::PayloadReader;
use crate::errors::{ErrorKind, StructuredError};
use crate::observability::messages::branch::ScratchCleanupFailed;
use crate::traits::Branch;
use crate::types::{fields, BranchItem, PartialResult};

/// Copies the whole payload to `<tmp_dir>/<uuid>` and references it as `localTmpFilepath`.
///
/// The scratch file belongs to the `storage_local` stage from then on.
pub struct TempLocalBranch {
    tmp_dir: PathBuf,
}

enum CopyOutcome {
    Complete,
    PayloadFault,
}

impl TempLocalBranch {
    pub fn new(tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            tmp_dir: tmp_dir.into(),
        }
    }

    async fn copy(reader: &mut PayloadReader, path: &Path) -> std::io::Result<CopyOutcome> {
        let mut file = File::create(path).await?;
        loop {
            match reader.next_chunk().await {
                Ok(Some(chunk)) => file.write_all(&chunk).await?,
                Ok(None) => break,
                Err(_) => {
                    file.flush().await?;
                    return Ok(CopyOutcome::PayloadFault);
                }
            }
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(CopyOutcome::Complete)
    }
}

#[async_trait]
impl Branch for TempLocalBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        let Some(mut reader) = item.payload else {
            return PartialResult::with_error(no_payload(self.name()));
        };

        let path = self.tmp_dir.join(Uuid::new_v4().to_string());
        let reference = [(
            fields::LOCAL_TMP_FILEPATH,
            json!(path.to_string_lossy().to_string()),
        )];

        match Self::copy(&mut reader, &path).await {
            Ok(_) => PartialResult::with_metadata(reference.into_iter().collect()),
            Err(error) => {
                reader.abandon();
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            "{}",
                            ScratchCleanupFailed {
                                path: &path,
                                error: &cleanup,
                            }
                        );
                    }
                }
                PartialResult::with_error(StructuredError::new(
                    ErrorKind::UpstreamUploadFailure,
                    format!("Failed to write scratch file '{}': {}", path.display(), error),
                ))
            }
        }
    }

    fn name(&self) -> &'static str {
        "storage_temp_local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::branches::test_support::run_branch;
    use crate::errors::PayloadError;
    use crate::types::Metadata;

    #[tokio::test]
    async fn payload_lands_in_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_branch(
            &TempLocalBranch::new(dir.path()),
            Metadata::new(),
            &[b"hello ", b"scratch"],
            None,
        )
        .await;

        let metadata = result.metadata.unwrap();
        let path = PathBuf::from(metadata.get_str(fields::LOCAL_TMP_FILEPATH).unwrap());
        assert!(path.starts_with(dir.path()));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello scratch");
    }

    #[tokio::test]
    async fn truncated_payload_still_references_the_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_branch(
            &TempLocalBranch::new(dir.path()),
            Metadata::new(),
            &[b"part"],
            Some(PayloadError::Truncated("early".into())),
        )
        .await;

        assert!(result.errors.is_none());
        let path = result.metadata.unwrap().get_str(fields::LOCAL_TMP_FILEPATH).unwrap().to_string();
        assert!(Path::new(&path).exists());
    }

    #[tokio::test]
    async fn unwritable_directory_is_an_upload_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let result = run_branch(&TempLocalBranch::new(&missing), Metadata::new(), &[b"x", b"y"], None).await;

        assert!(result.metadata.is_none());
        assert_eq!(result.errors.unwrap()[0].kind(), ErrorKind::UpstreamUploadFailure);
    }
}
