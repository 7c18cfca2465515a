// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::traits::Branch;
use crate::types::{BranchItem, PartialResult};

/// Passes the item's seed metadata (field name, filename, content type) through.
pub struct SeedMetadataBranch;

#[async_trait]
impl Branch for SeedMetadataBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        if let Some(reader) = item.payload {
            reader.abandon();
        }
        PartialResult::with_metadata(item.metadata.as_ref().clone())
    }

    fn name(&self) -> &'static str {
        "seed_metadata"
    }
}
