// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ExtensionCase;
use crate::types::Metadata;

/// Caller-supplied naming function for promoted files.
pub type FilenameFn = Arc<dyn Fn(&Metadata) -> String + Send + Sync>;

/// How a persistence stage names the permanent copy.
///
/// The base name comes from `filename_fn`, else the `property` metadata field,
/// else a fresh UUID. The original filename's extension is appended.
#[derive(Clone, Default)]
pub struct FilenamePolicy {
    pub filename_fn: Option<FilenameFn>,
    pub property: Option<String>,
    pub extension_case: ExtensionCase,
}

impl std::fmt::Debug for FilenamePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilenamePolicy")
            .field("filename_fn", &self.filename_fn.is_some())
            .field("property", &self.property)
            .field("extension_case", &self.extension_case)
            .finish()
    }
}

impl FilenamePolicy {
    pub fn new(property: Option<String>, extension_case: ExtensionCase) -> Self {
        Self {
            filename_fn: None,
            property,
            extension_case,
        }
    }

    pub fn with_filename_fn(mut self, filename_fn: FilenameFn) -> Self {
        self.filename_fn = Some(filename_fn);
        self
    }

    pub fn filename_for(&self, metadata: &Metadata) -> String {
        let base = match (&self.filename_fn, &self.property) {
            (Some(filename_fn), _) => filename_fn(metadata),
            (None, Some(property)) => property_value(metadata, property).unwrap_or_else(fresh_name),
            (None, None) => fresh_name(),
        };

        match self.extension(metadata) {
            Some(extension) => format!("{}.{}", base, extension),
            None => base,
        }
    }

    fn extension(&self, metadata: &Metadata) -> Option<String> {
        let extension = Path::new(metadata.filename()?).extension()?.to_str()?;
        Some(match self.extension_case {
            ExtensionCase::Preserve => extension.to_string(),
            ExtensionCase::Lower => extension.to_lowercase(),
            ExtensionCase::Upper => extension.to_uppercase(),
        })
    }
}

fn property_value(metadata: &Metadata, property: &str) -> Option<String> {
    match metadata.get(property)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn fresh_name() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: serde_json::Value) -> Metadata {
        match value {
            serde_json::Value::Object(map) => Metadata::from(map),
            _ => Metadata::new(),
        }
    }

    #[test]
    fn property_names_the_file_and_keeps_the_extension() {
        let policy = FilenamePolicy::new(Some("id".into()), ExtensionCase::Preserve);
        let name = policy.filename_for(&metadata(json!({"id": "abc", "filename": "Photo.JPG"})));
        assert_eq!(name, "abc.JPG");
    }

    #[test]
    fn extension_case_is_applied() {
        let policy = FilenamePolicy::new(Some("id".into()), ExtensionCase::Lower);
        assert_eq!(
            policy.filename_for(&metadata(json!({"id": 7, "filename": "Photo.JPG"}))),
            "7.jpg"
        );
    }

    #[test]
    fn missing_property_falls_back_to_a_uuid() {
        let policy = FilenamePolicy::new(Some("id".into()), ExtensionCase::Upper);
        let name = policy.filename_for(&metadata(json!({"filename": "notes.txt"})));
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert!(Uuid::parse_str(stem).is_ok());
        assert_eq!(ext, "TXT");
    }

    #[test]
    fn filename_fn_wins_over_property() {
        let policy = FilenamePolicy::new(Some("id".into()), ExtensionCase::Preserve)
            .with_filename_fn(Arc::new(|m: &Metadata| format!("user-{}", m.get_str("owner").unwrap_or("anon"))));
        let name = policy.filename_for(&metadata(json!({"id": "x", "owner": "kim", "filename": "a.png"})));
        assert_eq!(name, "user-kim.png");
    }

    #[test]
    fn filename_without_extension_adds_none() {
        let policy = FilenamePolicy::new(Some("id".into()), ExtensionCase::Preserve);
        assert_eq!(policy.filename_for(&metadata(json!({"id": "x", "filename": "README"}))), "x");
    }
}
