// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod extract;
mod record;
mod run;
mod storage;

pub use config::{ConfigError, ValidationError};
pub use extract::ExtractError;
pub use record::{ErrorKind, StructuredError};
pub use run::{PayloadError, RunError};
pub use storage::StorageError;
