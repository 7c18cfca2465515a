// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! All diagnostic and operational log lines go through message structs with a
//! `Display` implementation, so log call sites carry no literal strings:
//!
//! * `messages::pipeline` - run lifecycle, source and encoder events
//! * `messages::branch` - branch faults and the metadata-extraction worker
//! * `messages::stage` - post-processing stages and temporary resources
//!
//! # Usage
//!
//! ```rust
//! use stream_upload::observability::messages::pipeline::RunStarted;
//!
//! let msg = RunStarted {
//!     branches: &["payload_status", "file_size"],
//!     stages: &["storage_local"],
//!     post_concurrency: 4,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

pub mod messages;
