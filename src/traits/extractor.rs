// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use crate::errors::ExtractError;

/// A metadata extractor shared by every item of a run.
///
/// `extract` answers with the raw tag document for one file, including the
/// `SourceFile` it describes so callers can check the answer's identity.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<Value, ExtractError>;

    fn program(&self) -> &str;

    /// Stop any long-lived worker. Later calls to `extract` may start a new one.
    async fn shutdown(&self) {}
}
