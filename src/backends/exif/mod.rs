// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Embedded-metadata branch backed by a shared extractor.
//!
//! Only a bounded prefix of each payload is read. It is written to a scratch
//! file, the payload view is abandoned so the other branches keep streaming,
//! and the extractor is asked about the scratch file.

mod mapping;
mod process;

pub use mapping::map_exif;
pub use process::ExiftoolProcess;

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::backends::branches::no_payload;
use crate::engine::broadcast::PayloadReader;
use crate::errors::{ErrorKind, ExtractError, StructuredError};
use crate::observability::messages::branch::ScratchCleanupFailed;
use crate::traits::{Branch, MetadataExtractor};
use crate::types::{BranchItem, PartialResult};

pub struct ExifBranch {
    extractor: Arc<dyn MetadataExtractor>,
    read_limit: usize,
    tmp_dir: PathBuf,
}

enum Prefix {
    Written,
    PayloadFault,
}

impl ExifBranch {
    pub fn new(extractor: Arc<dyn MetadataExtractor>, read_limit: usize, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            read_limit,
            tmp_dir: tmp_dir.into(),
        }
    }

    /// Copy at most `read_limit` bytes of the payload to `path`.
    async fn write_prefix(&self, reader: &mut PayloadReader, path: &Path) -> std::io::Result<Prefix> {
        let mut file = File::create(path).await?;
        let mut written = 0usize;
        while written < self.read_limit {
            match reader.next_chunk().await {
                Ok(Some(chunk)) => {
                    let take = chunk.len().min(self.read_limit - written);
                    file.write_all(&chunk[..take]).await?;
                    written += take;
                }
                Ok(None) => break,
                Err(_) => return Ok(Prefix::PayloadFault),
            }
        }
        file.flush().await?;
        Ok(Prefix::Written)
    }

    async fn extract(&self, path: &Path) -> Result<Value, ExtractError> {
        let document = self.extractor.extract(path).await?;
        let source = document.get("SourceFile").and_then(Value::as_str).unwrap_or_default();
        if !same_file(source, path).await {
            return Err(ExtractError::IdentityMismatch {
                expected: path.to_path_buf(),
                actual: source.to_string(),
            });
        }
        Ok(document)
    }

    fn failure(&self, error: ExtractError) -> PartialResult {
        PartialResult::with_error(StructuredError::new(
            ErrorKind::ExtractionFailure,
            format!("{} ({}): {}", self.name(), self.extractor.program(), error),
        ))
    }
}

async fn same_file(reported: &str, expected: &Path) -> bool {
    if reported.is_empty() {
        return false;
    }
    if Path::new(reported) == expected {
        return true;
    }
    match (
        tokio::fs::canonicalize(reported).await,
        tokio::fs::canonicalize(expected).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

async fn remove_scratch(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await {
        if error.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("{}", ScratchCleanupFailed { path, error: &error });
        }
    }
}

#[async_trait]
impl Branch for ExifBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        let Some(mut reader) = item.payload else {
            return PartialResult::with_error(no_payload(self.name()));
        };

        let scratch = self.tmp_dir.join(Uuid::new_v4().to_string());
        let prefix = self.write_prefix(&mut reader, &scratch).await;
        reader.abandon();

        let result = match prefix {
            Ok(Prefix::Written) => match self.extract(&scratch).await {
                Ok(document) => PartialResult::with_metadata(map_exif(&document)),
                Err(error) => self.failure(error),
            },
            Ok(Prefix::PayloadFault) => PartialResult::empty(),
            Err(error) => self.failure(ExtractError::Scratch {
                path: scratch.clone(),
                reason: error.to_string(),
            }),
        };

        remove_scratch(&scratch).await;
        result
    }

    fn name(&self) -> &'static str {
        "exiftool"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::branches::test_support::{run_branch, run_without_payload};
    use crate::backends::stub::StubExtractor;
    use crate::errors::PayloadError;
    use crate::types::Metadata;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers with the scratch file's contents as the `Warning` tag.
    struct ReadingExtractor {
        seen: Mutex<Vec<u8>>,
    }

    #[async_trait]
    impl MetadataExtractor for ReadingExtractor {
        async fn extract(&self, path: &Path) -> Result<Value, ExtractError> {
            let bytes = tokio::fs::read(path).await?;
            *self.seen.lock().unwrap() = bytes.clone();
            Ok(json!({
                "SourceFile": path.to_string_lossy(),
                "Warning": String::from_utf8_lossy(&bytes),
            }))
        }

        fn program(&self) -> &str {
            "reader"
        }
    }

    #[tokio::test]
    async fn only_the_prefix_reaches_the_extractor() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Arc::new(ReadingExtractor {
            seen: Mutex::new(Vec::new()),
        });
        let branch = ExifBranch::new(extractor.clone(), 6, dir.path());

        let result = run_branch(&branch, Metadata::new(), &[b"head", b"er-and-tail", b"more"], None).await;

        assert_eq!(extractor.seen.lock().unwrap().as_slice(), b"header");
        assert_eq!(result.metadata.unwrap().get("warning"), Some(&json!("header")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn extracted_tags_are_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Arc::new(StubExtractor::answering(json!({
            "MIMEType": "image/png",
            "ImageWidth": 640,
            "ImageHeight": 480,
        })));
        let branch = ExifBranch::new(extractor.clone(), 1024, dir.path());

        let result = run_branch(&branch, Metadata::new(), &[b"\x89PNG"], None).await;

        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.get("contentType"), Some(&json!("image/png")));
        assert_eq!(metadata.get("width"), Some(&json!(640)));
        assert!(result.errors.is_none());
        let requested = extractor.requested();
        assert_eq!(requested.len(), 1);
        assert!(!requested[0].exists());
    }

    #[tokio::test]
    async fn answer_for_another_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut stub = StubExtractor::answering(json!({"SourceFile": "/elsewhere/photo.jpg"}));
        stub.echo_source = false;
        let branch = ExifBranch::new(Arc::new(stub), 1024, dir.path());

        let result = run_branch(&branch, Metadata::new(), &[b"bytes"], None).await;

        assert!(result.metadata.is_none());
        let errors = result.errors.unwrap();
        assert_eq!(errors[0].kind(), ErrorKind::ExtractionFailure);
        assert!(errors[0].message().contains("/elsewhere/photo.jpg"));
    }

    #[tokio::test]
    async fn extractor_failure_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let branch = ExifBranch::new(
            Arc::new(StubExtractor::failing(ExtractError::WorkerExited)),
            1024,
            dir.path(),
        );

        let result = run_branch(&branch, Metadata::new(), &[b"bytes"], None).await;

        let errors = result.errors.unwrap();
        assert_eq!(errors[0].kind(), ErrorKind::ExtractionFailure);
        assert_eq!(errors[0].message(), "exiftool (stub-extractor): Worker exited before answering");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn payload_fault_before_the_limit_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Arc::new(StubExtractor::answering(json!({"MIMEType": "image/png"})));
        let branch = ExifBranch::new(extractor.clone(), 1024, dir.path());

        let result = run_branch(
            &branch,
            Metadata::new(),
            &[b"par"],
            Some(PayloadError::Truncated("client went away".into())),
        )
        .await;

        assert!(result.metadata.is_none());
        assert!(result.errors.is_none());
        assert!(extractor.requested().is_empty());
    }

    #[tokio::test]
    async fn item_without_payload_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let branch = ExifBranch::new(Arc::new(StubExtractor::answering(json!({}))), 1024, dir.path());

        let result = run_without_payload(&branch, Metadata::new()).await;

        assert_eq!(result.errors.unwrap()[0].kind(), ErrorKind::InvalidInput);
    }
}
