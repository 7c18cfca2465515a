// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for structured logging, grouped by subsystem.
//!
//! Each type implements `Display` for the human-readable line. Types that are
//! logged from hot paths also implement [`StructuredLog`], which emits the same
//! line with its fields attached as `tracing` key/values.

pub mod branch;
pub mod pipeline;
pub mod stage;

use tracing::Span;

/// Emit a message at its own level with structured fields.
pub trait StructuredLog {
    fn log(&self);

    /// A span carrying the message's fields, for wrapping the work it describes.
    fn span(&self, name: &str) -> Span {
        let _ = name;
        Span::none()
    }
}
