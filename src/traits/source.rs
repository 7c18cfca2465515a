// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::errors::{PayloadError, RunError};
use crate::types::Metadata;

/// Byte payload of one item, read exactly once.
pub type PayloadStream = BoxStream<'static, Result<Bytes, PayloadError>>;

/// One item as produced by an [`ItemSource`], before it is indexed and fanned out.
pub struct SourceItem {
    /// Seed fields: `fieldname`, `filename`, `contentType` when known.
    pub metadata: Metadata,
    /// `None` for items that carry no byte stream.
    pub body: Option<PayloadStream>,
}

impl SourceItem {
    pub fn new(metadata: Metadata, body: PayloadStream) -> Self {
        Self {
            metadata,
            body: Some(body),
        }
    }

    pub fn without_body(metadata: Metadata) -> Self {
        Self {
            metadata,
            body: None,
        }
    }
}

/// Ordered producer of items (the decoder seam).
///
/// The pipeline fully consumes an item's `body` before asking for the next item.
/// An `Err` is an envelope fault: fatal before the first item, end-of-sequence after.
#[async_trait]
pub trait ItemSource: Send {
    async fn next_item(&mut self) -> Result<Option<SourceItem>, RunError>;
}
