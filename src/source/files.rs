// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::json;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

use crate::config::consts::DEFAULT_READ_CHUNK_SIZE;
use crate::errors::{PayloadError, RunError};
use crate::traits::{ItemSource, PayloadStream, SourceItem};
use crate::types::{fields, Metadata};

/// Yields one item per file, in the order given.
///
/// A file that cannot be opened still yields an item; its payload fails at once,
/// so the fault is reported on that record rather than ending the run.
pub struct FileSource {
    paths: VecDeque<PathBuf>,
    fieldname: String,
    chunk_size: usize,
}

impl FileSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
            fieldname: "file".to_string(),
            chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }

    pub fn with_fieldname(mut self, fieldname: impl Into<String>) -> Self {
        self.fieldname = fieldname.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn seed(&self, path: &Path) -> Metadata {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        [
            (fields::FIELDNAME, json!(self.fieldname)),
            (fields::CONTENT_TYPE, json!(guess_content_type(&filename))),
            (fields::FILENAME, json!(filename)),
        ]
        .into_iter()
        .collect()
    }
}

#[async_trait]
impl ItemSource for FileSource {
    async fn next_item(&mut self) -> Result<Option<SourceItem>, RunError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let metadata = self.seed(&path);

        let body: PayloadStream = match tokio::fs::File::open(&path).await {
            Ok(file) => ReaderStream::with_capacity(file, self.chunk_size)
                .map_err(|e| PayloadError::Truncated(e.to_string()))
                .boxed(),
            Err(error) => {
                let fault = PayloadError::Truncated(format!("cannot open '{}': {}", path.display(), error));
                stream::once(async move { Err(fault) }).boxed()
            }
        };
        Ok(Some(SourceItem::new(metadata, body)))
    }
}

/// Content type from a filename's extension; unknown extensions are `application/octet-stream`.
pub fn guess_content_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(body: PayloadStream) -> (Vec<u8>, Option<PayloadError>) {
        let mut bytes = Vec::new();
        let mut body = body;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(error) => return (bytes, Some(error)),
            }
        }
        (bytes, None)
    }

    #[tokio::test]
    async fn files_are_streamed_in_order_with_seed_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one.PNG");
        let second = dir.path().join("two.bin");
        std::fs::write(&first, b"first file").unwrap();
        std::fs::write(&second, vec![7u8; 10]).unwrap();

        let mut source = FileSource::new([first, second]).with_chunk_size(4);

        let item = source.next_item().await.unwrap().unwrap();
        assert_eq!(item.metadata.filename(), Some("one.PNG"));
        assert_eq!(item.metadata.content_type(), Some("image/png"));
        assert_eq!(item.metadata.get_str(fields::FIELDNAME), Some("file"));
        assert_eq!(collect(item.body.unwrap()).await, (b"first file".to_vec(), None));

        let item = source.next_item().await.unwrap().unwrap();
        assert_eq!(item.metadata.content_type(), Some("application/octet-stream"));
        assert_eq!(collect(item.body.unwrap()).await.0.len(), 10);

        assert!(source.next_item().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_file_becomes_a_failing_payload() {
        let mut source = FileSource::new([PathBuf::from("/definitely/not/here.jpg")]);
        let item = source.next_item().await.unwrap().unwrap();

        let (bytes, fault) = collect(item.body.unwrap()).await;
        assert!(bytes.is_empty());
        assert!(matches!(fault, Some(PayloadError::Truncated(reason)) if reason.contains("cannot open")));
    }

    #[test]
    fn content_type_ignores_extension_case() {
        assert_eq!(guess_content_type("IMG_0001.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("archive"), "application/octet-stream");
    }
}
