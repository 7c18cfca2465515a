// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // branches, stages, object stores
pub mod config;     // config + runtime builder
pub mod engine;     // fan-out, join, chain, output
pub mod errors;     // error handling
pub mod observability;
pub mod source;     // bundled item sources
pub mod traits;     // seams between engine and backends
pub mod types;
pub mod utils;
