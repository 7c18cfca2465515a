// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concrete branches, persistence stages and the storage they talk to.
//!
//! # Available Backends
//!
//! ## Branches
//! Fan-out analyses run once per item over a shared payload view:
//! - **Seed / status**: `seed_metadata`, `payload_status`
//! - **Byte analyses**: `file_size`, `file_hash`
//! - **Temporary persistence**: `storage_temp_local`, `storage_temp_object`
//! - **Embedded metadata**: `exiftool`, backed by one long-lived worker
//!
//! ## Stages
//! Post-processing steps that promote a temporary resource to its permanent home:
//! - **storage_local**: scratch file moved into a directory
//! - **storage_object**: temporary object copied within or across object stores
//!
//! ## Stub Backend (Test-Only)
//! Test doubles for the engine and chain (only available in test builds):
//! - **StubBranch**, **PrefixBranch**, **PanickingBranch**
//! - **StubStage**, **StubExtractor**
//!
//! # Architecture
//!
//! ```text
//! Configuration → Factory → Branch / PostStage instance → Pipeline
//! ```

pub mod branches;
pub mod exif;
pub mod object;
pub mod stages;
#[cfg(test)]
pub mod stub;
