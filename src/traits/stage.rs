// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::StructuredError;
use crate::types::Metadata;

/// One persistence step of the post-processing chain.
///
/// A stage declares the fields it needs and the temporary-resource fields it
/// takes ownership of. The chain drives the protocol: validate, promote when the
/// record is clean, release the temporary resource when it was not consumed, then
/// strip the temporary fields. Stages only implement the two storage calls.
#[async_trait]
pub trait PostStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fields that must be present before `promote` is attempted.
    fn required_fields(&self) -> &'static [&'static str];

    /// Fields referencing the temporary resource this stage owns.
    fn temp_fields(&self) -> &'static [&'static str];

    /// Make the temporary resource permanent. Returns the permanent-location fields to add.
    async fn promote(&self, metadata: &Metadata) -> Result<Metadata, StructuredError>;

    /// Delete the temporary resource.
    async fn release(&self, metadata: &Metadata) -> Result<(), StructuredError>;

    /// `true` when a successful `promote` already removed the temporary resource (a move).
    fn promote_consumes_temp(&self) -> bool {
        false
    }

    /// `true` to leave the temporary resource and its fields in place.
    fn keeps_temp(&self) -> bool {
        false
    }
}
