// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod metadata;

pub use metadata::{attribute_value, kebab_case, prune_empty};
