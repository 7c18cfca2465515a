// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in fan-out branches.
//!
//! Byte-oriented branches report an item without a payload stream as `invalid-input`.
//! When the payload itself faults they emit an empty result and leave reporting to
//! [`PayloadStatusBranch`], so each truncation appears once per record. Temp-storage
//! branches are the exception: whatever they created is still referenced so the
//! post chain can delete it.

mod file_hash;
mod file_size;
mod payload_status;
mod seed_metadata;
mod temp_local;
mod temp_object;

pub use file_hash::FileHashBranch;
pub use file_size::FileSizeBranch;
pub use payload_status::PayloadStatusBranch;
pub use seed_metadata::SeedMetadataBranch;
pub use temp_local::TempLocalBranch;
pub use temp_object::TempObjectBranch;

use crate::errors::StructuredError;

pub(crate) fn no_payload(branch: &str) -> StructuredError {
    StructuredError::invalid_input(format!("{}: item has no payload stream", branch))
}

#[cfg(test)]
pub(crate) mod test_support {
    use bytes::Bytes;
    use std::sync::Arc;

    use crate::engine::broadcast;
    use crate::errors::PayloadError;
    use crate::traits::Branch;
    use crate::types::{BranchItem, Metadata, PartialResult};

    /// Run `branch` over one item whose payload is `chunks`, optionally ending in `fault`.
    pub async fn run_branch(
        branch: &dyn Branch,
        metadata: Metadata,
        chunks: &[&[u8]],
        fault: Option<PayloadError>,
    ) -> PartialResult {
        let (mut sender, mut readers) = broadcast::channel(1);
        let item = BranchItem {
            index: 0,
            metadata: Arc::new(metadata),
            payload: readers.pop(),
        };

        let pump = async move {
            for chunk in chunks {
                sender.send(Bytes::copy_from_slice(chunk)).await;
            }
            match fault {
                Some(error) => sender.fail(error).await,
                None => sender.finish().await,
            }
        };
        let (result, ()) = tokio::join!(branch.process(item), pump);
        result
    }

    /// Run `branch` over one item with no payload at all.
    pub async fn run_without_payload(branch: &dyn Branch, metadata: Metadata) -> PartialResult {
        branch
            .process(BranchItem {
                index: 0,
                metadata: Arc::new(metadata),
                payload: None,
            })
            .await
    }
}
