// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::collections::VecDeque;

use crate::errors::{PayloadError, RunError};
use crate::traits::{ItemSource, SourceItem};
use crate::types::{fields, Metadata};

/// One scripted item.
#[derive(Debug, Clone)]
pub struct MemoryItem {
    pub metadata: Metadata,
    /// `None` produces an item without a byte stream.
    pub chunks: Option<Vec<Bytes>>,
    /// Raised after the last chunk.
    pub fault: Option<PayloadError>,
}

impl MemoryItem {
    pub fn file(filename: &str, content_type: &str, chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            metadata: [
                (fields::FIELDNAME, serde_json::Value::from("file")),
                (fields::FILENAME, serde_json::Value::from(filename)),
                (fields::CONTENT_TYPE, serde_json::Value::from(content_type)),
            ]
            .into_iter()
            .collect(),
            chunks: Some(chunks.into_iter().collect()),
            fault: None,
        }
    }

    /// An item with metadata but no byte stream.
    pub fn field(metadata: Metadata) -> Self {
        Self {
            metadata,
            chunks: None,
            fault: None,
        }
    }

    /// End the payload with a truncation fault instead of a clean end.
    pub fn truncated(mut self, reason: impl Into<String>) -> Self {
        self.fault = Some(PayloadError::Truncated(reason.into()));
        self
    }
}

enum Entry {
    Item(MemoryItem),
    EnvelopeError(String),
}

/// Replays scripted items and envelope faults in order.
#[derive(Default)]
pub struct MemorySource {
    entries: VecDeque<Entry>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: MemoryItem) -> Self {
        self.entries.push_back(Entry::Item(item));
        self
    }

    /// Fail the envelope at this point; nothing after it is produced.
    pub fn with_envelope_error(mut self, message: impl Into<String>) -> Self {
        self.entries.push_back(Entry::EnvelopeError(message.into()));
        self
    }
}

impl FromIterator<MemoryItem> for MemorySource {
    fn from_iter<I: IntoIterator<Item = MemoryItem>>(items: I) -> Self {
        Self {
            entries: items.into_iter().map(Entry::Item).collect(),
        }
    }
}

#[async_trait]
impl ItemSource for MemorySource {
    async fn next_item(&mut self) -> Result<Option<SourceItem>, RunError> {
        match self.entries.pop_front() {
            None => Ok(None),
            Some(Entry::EnvelopeError(message)) => {
                self.entries.clear();
                Err(RunError::MalformedInput(message))
            }
            Some(Entry::Item(item)) => {
                let Some(chunks) = item.chunks else {
                    return Ok(Some(SourceItem::without_body(item.metadata)));
                };
                let body = stream::iter(chunks.into_iter().map(Ok).chain(item.fault.map(Err))).boxed();
                Ok(Some(SourceItem::new(item.metadata, body)))
            }
        }
    }
}
