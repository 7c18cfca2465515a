// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Incremental JSON array output.
//!
//! The opening bracket goes out with the first record, every later record is
//! prefixed by a comma, and `finish` closes the array (or writes `[]` when no
//! record was ever written). Only one record's serialized form is held at a time.

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::errors::RunError;
use crate::types::{Metadata, Record};

/// Wire shape of one record. Errors are rendered to their messages and omitted when empty.
#[derive(Serialize)]
struct RenderedRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Metadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<&'a str>,
}

impl<'a> From<&'a Record> for RenderedRecord<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            metadata: record.metadata(),
            errors: record.errors().iter().map(|e| e.message()).collect(),
        }
    }
}

#[derive(Serialize)]
struct RenderedFatal<'a> {
    error: &'a str,
}

pub struct JsonArrayEncoder<W> {
    sink: W,
    opened: bool,
    buffer: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> JsonArrayEncoder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            opened: false,
            buffer: Vec::new(),
        }
    }

    /// `true` once the opening bracket has been written.
    pub fn has_started(&self) -> bool {
        self.opened
    }

    /// Append one record; returns the number of bytes written.
    pub async fn write_record(&mut self, record: &Record) -> Result<usize, RunError> {
        self.buffer.clear();
        self.buffer.push(if self.opened { b',' } else { b'[' });
        serde_json::to_writer(&mut self.buffer, &RenderedRecord::from(record)).map_err(|e| {
            RunError::InternalError {
                message: format!("failed to serialize record #{}: {}", record.index, e),
            }
        })?;

        self.sink.write_all(&self.buffer).await?;
        self.opened = true;
        Ok(self.buffer.len())
    }

    /// Close the array and flush. Returns the sink.
    pub async fn finish(mut self) -> Result<W, RunError> {
        let tail: &[u8] = if self.opened { b"]" } else { b"[]" };
        self.sink.write_all(tail).await?;
        self.sink.flush().await?;
        Ok(self.sink)
    }

    /// Write a single error object in place of the array.
    ///
    /// Only possible before the first record; afterwards the caller can only stop writing.
    pub async fn write_fatal(mut self, error: &RunError) -> Result<W, RunError> {
        if self.opened {
            return Err(RunError::InternalError {
                message: "fatal error after the output array was opened".to_string(),
            });
        }
        let message = error.to_string();
        let body = serde_json::to_vec(&RenderedFatal { error: &message }).map_err(|e| {
            RunError::InternalError {
                message: format!("failed to serialize fatal error: {}", e),
            }
        })?;
        self.sink.write_all(&body).await?;
        self.sink.flush().await?;
        Ok(self.sink)
    }
}
