// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Data model shared by the engine, the branches and the post-processing stages.
//!
//! * [`BranchItem`] - one item as a single branch sees it (metadata snapshot + payload view)
//! * [`PartialResult`] - one branch's output for one item
//! * [`ResultGroup`] - the aligned partial results for one item index
//! * [`Record`] - the merged accumulator threaded through the post-processing chain

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::engine::broadcast::PayloadReader;
use crate::errors::StructuredError;

/// Well-known metadata field names.
///
/// Stages declare their required fields from this list, so the contract between
/// a temp-storage branch and the stage that promotes its output is checked in one place.
pub mod fields {
    pub const FIELDNAME: &str = "fieldname";
    pub const FILENAME: &str = "filename";
    pub const CONTENT_TYPE: &str = "contentType";
    pub const ENCODING: &str = "encoding";
    pub const SIZE: &str = "size";

    pub const LOCAL_TMP_FILEPATH: &str = "localTmpFilepath";
    pub const STORAGE_LOCAL_FILENAME: &str = "storageLocalFilename";
    pub const STORAGE_LOCAL_FILEPATH: &str = "storageLocalFilepath";

    pub const OBJECT_TEMP_BUCKET: &str = "objectTempBucket";
    pub const OBJECT_TEMP_KEY: &str = "objectTempKey";
    pub const OBJECT_BUCKET: &str = "objectBucket";
    pub const OBJECT_KEY: &str = "objectKey";
}

/// String-keyed metadata map. Values are restricted to JSON shapes
/// (scalar, map, list), which is what the merge step combines over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Like [`Metadata::get_str`] but treats the empty string as absent.
    pub fn get_non_empty_str(&self, key: &str) -> Option<&str> {
        self.get_str(key).filter(|s| !s.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.get(key).map_or(false, |v| !v.is_null())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn filename(&self) -> Option<&str> {
        self.get_str(fields::FILENAME)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get_str(fields::CONTENT_TYPE)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Metadata {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// One item as delivered to one branch.
///
/// `payload` is `None` when the item carries no byte stream at all
/// (e.g. a plain form field); byte-oriented branches report that as invalid input.
pub struct BranchItem {
    pub index: u64,
    pub metadata: Arc<Metadata>,
    pub payload: Option<PayloadReader>,
}

/// The output of one branch for one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialResult {
    pub metadata: Option<Metadata>,
    pub errors: Option<Vec<StructuredError>>,
}

impl PartialResult {
    /// Nothing to contribute (e.g. a payload-only check that passed).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            metadata: Some(metadata),
            errors: None,
        }
    }

    pub fn with_error(error: StructuredError) -> Self {
        Self {
            metadata: None,
            errors: Some(vec![error]),
        }
    }
}

/// The partial results for one item, in branch-registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultGroup {
    pub index: u64,
    pub results: Vec<PartialResult>,
}

/// The merged per-item accumulator.
///
/// `errors` is append-only. `None` and `Some(vec![])` are both "clean"; only the
/// former is produced by a merge of error-free results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub index: u64,
    pub metadata: Option<Metadata>,
    pub errors: Option<Vec<StructuredError>>,
}

impl Record {
    pub fn new(index: u64, metadata: Metadata) -> Self {
        Self {
            index,
            metadata: Some(metadata),
            errors: None,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().map_or(false, |e| !e.is_empty())
    }

    pub fn errors(&self) -> &[StructuredError] {
        self.errors.as_deref().unwrap_or(&[])
    }

    pub fn push_error(&mut self, error: StructuredError) {
        self.errors.get_or_insert_with(Vec::new).push(error);
    }

    pub fn extend_errors(&mut self, errors: impl IntoIterator<Item = StructuredError>) {
        let mut errors = errors.into_iter().peekable();
        if errors.peek().is_some() {
            self.errors.get_or_insert_with(Vec::new).extend(errors);
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        self.metadata.get_or_insert_with(Metadata::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn empty_string_is_not_a_usable_value() {
        let metadata: Metadata = [("id", json!("")), ("name", json!("a.png"))].into_iter().collect();
        assert_eq!(metadata.get_non_empty_str("id"), None);
        assert_eq!(metadata.get_non_empty_str("name"), Some("a.png"));
    }

    #[test]
    fn null_counts_as_absent() {
        let metadata: Metadata = [("contentType", Value::Null)].into_iter().collect();
        assert!(!metadata.contains(fields::CONTENT_TYPE));
    }

    #[test]
    fn record_errors_stay_absent_until_pushed() {
        let mut record = Record::new(0, Metadata::new());
        record.extend_errors(Vec::new());
        assert!(record.errors.is_none());
        assert!(!record.has_errors());

        record.push_error(StructuredError::new(ErrorKind::Aborted, "stop"));
        assert!(record.has_errors());
        assert_eq!(record.errors().len(), 1);
    }
}
