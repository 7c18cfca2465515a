// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Persistence stages for the post-processing chain.

mod filename;
mod storage_local;
mod storage_object;

pub use filename::{FilenameFn, FilenamePolicy};
pub use storage_local::LocalStorageStage;
pub use storage_object::ObjectStorageStage;

use crate::errors::StructuredError;
use crate::types::Metadata;

/// A string field the chain already checked for; anything else is reported as missing.
pub(crate) fn required_str<'a>(stage: &str, metadata: &'a Metadata, field: &str) -> Result<&'a str, StructuredError> {
    metadata
        .get_non_empty_str(field)
        .ok_or_else(|| StructuredError::missing_field(stage, field))
}
