// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;

use crate::backends::branches::no_payload;
use crate::traits::Branch;
use crate::types::{fields, BranchItem, PartialResult};

/// Counts payload bytes: `{size}`.
pub struct FileSizeBranch;

#[async_trait]
impl Branch for FileSizeBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        let Some(mut reader) = item.payload else {
            return PartialResult::with_error(no_payload(self.name()));
        };

        let mut size = 0u64;
        loop {
            match reader.next_chunk().await {
                Ok(Some(chunk)) => size += chunk.len() as u64,
                Ok(None) => break,
                Err(_) => return PartialResult::empty(),
            }
        }
        PartialResult::with_metadata([(fields::SIZE, json!(size))].into_iter().collect())
    }

    fn name(&self) -> &'static str {
        "file_size"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::branches::test_support::{run_branch, run_without_payload};
    use crate::errors::{ErrorKind, PayloadError};
    use crate::types::Metadata;

    #[tokio::test]
    async fn counts_every_chunk() {
        let result = run_branch(&FileSizeBranch, Metadata::new(), &[b"12345", b"", b"678"], None).await;
        assert_eq!(result.metadata.unwrap().get(fields::SIZE), Some(&json!(8)));
    }

    #[tokio::test]
    async fn missing_payload_is_invalid_input() {
        let result = run_without_payload(&FileSizeBranch, Metadata::new()).await;
        assert_eq!(result.errors.unwrap()[0].kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn truncated_payload_contributes_nothing() {
        let result = run_branch(
            &FileSizeBranch,
            Metadata::new(),
            &[b"12"],
            Some(PayloadError::Truncated("early".into())),
        )
        .await;
        assert_eq!(result, PartialResult::empty());
    }
}
