// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Deterministic combine of one [`ResultGroup`] into one [`Record`].
//!
//! Metadata is folded left to right, one top-level key at a time:
//!
//! | earlier   | later     | result                       |
//! |-----------|-----------|------------------------------|
//! | list      | list      | concatenation, earlier first |
//! | list      | non-list  | later value appended         |
//! | anything  | anything  | later value                  |
//!
//! Errors are concatenated in group order. A group where nobody reported an
//! error produces a record with `errors: None`.

use serde_json::Value;

use crate::errors::StructuredError;
use crate::types::{Metadata, Record, ResultGroup};

/// Combine two values under the same key; `later` wins unless `earlier` is a list.
pub fn combine(earlier: Value, later: Value) -> Value {
    match (earlier, later) {
        (Value::Array(mut head), Value::Array(tail)) => {
            head.extend(tail);
            Value::Array(head)
        }
        (Value::Array(mut head), item) => {
            head.push(item);
            Value::Array(head)
        }
        (_, later) => later,
    }
}

/// Fold `later` into `into` key by key.
pub fn merge_metadata(into: &mut Metadata, later: Metadata) {
    for (key, value) in later {
        let merged = match into.remove(&key) {
            Some(existing) => combine(existing, value),
            None => value,
        };
        into.insert(key, merged);
    }
}

/// Merge a group that should hold exactly `arity` results.
pub fn merge_group(group: ResultGroup, arity: usize) -> Record {
    let index = group.index;
    if group.results.len() != arity {
        return Record {
            index,
            metadata: None,
            errors: Some(vec![StructuredError::invalid_input(format!(
                "Invalid result group for item #{}: expected {} results, got {}",
                index,
                arity,
                group.results.len()
            ))]),
        };
    }

    let mut metadata: Option<Metadata> = None;
    let mut errors: Option<Vec<StructuredError>> = None;

    for result in group.results {
        if let Some(contributed) = result.metadata {
            match metadata.as_mut() {
                Some(existing) => merge_metadata(existing, contributed),
                None => metadata = Some(contributed),
            }
        }
        if let Some(reported) = result.errors {
            errors.get_or_insert_with(Vec::new).extend(reported);
        }
    }

    Record {
        index,
        metadata: Some(metadata.unwrap_or_default()),
        errors,
    }
}
