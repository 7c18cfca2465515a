// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::types::{BranchItem, PartialResult};

/// A per-item analysis run concurrently with its siblings.
///
/// `process` is called once per item and must resolve to exactly one
/// [`PartialResult`]. Per-item faults go into the result's `errors`; a branch
/// never fails the run. If the branch does not need the whole payload it must
/// abandon or drain its reader rather than hold it.
#[async_trait]
pub trait Branch: Send + Sync {
    async fn process(&self, item: BranchItem) -> PartialResult;

    fn name(&self) -> &'static str;
}
