// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::{ErrorKind, StructuredError};
use crate::traits::Branch;
use crate::types::{BranchItem, PartialResult};

/// Drains the payload and turns a payload fault into the item's single
/// `payload-truncated` error. Contributes nothing on a clean end.
pub struct PayloadStatusBranch;

#[async_trait]
impl Branch for PayloadStatusBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        let Some(reader) = item.payload else {
            return PartialResult::empty();
        };

        match reader.drain().await {
            Ok(_) => PartialResult::empty(),
            Err(error) => PartialResult::with_error(StructuredError::new(
                ErrorKind::PayloadTruncated,
                error.to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "payload_status"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::branches::test_support::{run_branch, run_without_payload};
    use crate::errors::PayloadError;
    use crate::types::Metadata;

    #[tokio::test]
    async fn clean_payload_contributes_nothing() {
        let result = run_branch(&PayloadStatusBranch, Metadata::new(), &[b"abc", b"def"], None).await;
        assert_eq!(result, PartialResult::empty());
    }

    #[tokio::test]
    async fn truncation_becomes_one_error() {
        let result = run_branch(
            &PayloadStatusBranch,
            Metadata::new(),
            &[b"abc"],
            Some(PayloadError::Truncated("Part terminated early".into())),
        )
        .await;

        let errors = result.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::PayloadTruncated);
        assert_eq!(errors[0].message(), "Unexpected end of payload: Part terminated early");
    }

    #[tokio::test]
    async fn items_without_payload_are_not_an_error_here() {
        let result = run_without_payload(&PayloadStatusBranch, Metadata::new()).await;
        assert_eq!(result, PartialResult::empty());
    }
}
