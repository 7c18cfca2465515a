// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bundled [`ItemSource`](crate::traits::ItemSource) implementations.
//!
//! * [`FileSource`] - files on disk, streamed in chunks
//! * [`MemorySource`] - scripted in-memory items, including faults

mod files;
mod memory;

pub use files::{guess_content_type, FileSource};
pub use memory::{MemoryItem, MemorySource};
