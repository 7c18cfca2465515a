// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_EXIFTOOL_PROGRAM, DEFAULT_EXIF_READ_LIMIT, DEFAULT_POST_CONCURRENCY};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for the upload pipeline.
///
/// Branches and stages are ordered lists: branch order fixes merge precedence,
/// stage order is the order records pass through the post-processing chain.
///
/// # Example
/// ```yaml
/// post_concurrency: 4
/// stores:
///   uploads:
///     type: s3
///     bucket: my-uploads
///     region: eu-west-1
/// branches:
///   - type: seed_metadata
///   - type: file_size
///   - type: file_hash
///     algorithm: sha256
///   - type: storage_temp_object
///     store: uploads
///     path: tmp
/// stages:
///   - type: storage_object
///     store: uploads
///     path: files
///     filename_property: id
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_post_concurrency")]
    pub post_concurrency: usize,
    #[serde(default)]
    pub stores: BTreeMap<String, StoreConfig>,
    pub branches: Vec<BranchConfig>,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

/// A named object store that branches and stages refer to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local store, mainly for tests and dry runs.
    Memory {
        #[serde(default)]
        bucket: Option<String>,
    },
    /// A directory used as an object store.
    Local {
        root: PathBuf,
        #[serde(default = "default_true")]
        ensure_dir: bool,
    },
    /// An S3 bucket; credentials come from the environment.
    S3 {
        bucket: String,
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        allow_http: bool,
    },
}

impl StoreConfig {
    /// Bucket name reported in record metadata; memory and local stores use the store name.
    pub fn bucket_name<'a>(&'a self, store_name: &'a str) -> &'a str {
        match self {
            StoreConfig::Memory { bucket } => bucket.as_deref().unwrap_or(store_name),
            StoreConfig::Local { .. } => store_name,
            StoreConfig::S3 { bucket, .. } => bucket,
        }
    }
}

/// Digest used by the `file_hash` branch.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// Also the metadata field name the digest is stored under.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

/// Text encoding of a digest.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HashEncoding {
    #[default]
    Hex,
    Base64,
}

/// Case applied to the original extension when building a stored filename.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionCase {
    #[default]
    Preserve,
    Lower,
    Upper,
}

/// One fan-out branch.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BranchConfig {
    /// Emits the item's seed metadata.
    SeedMetadata,
    /// Drains the payload and reports truncation.
    PayloadStatus,
    /// Payload size in bytes.
    FileSize,
    /// Payload digest.
    FileHash {
        #[serde(default)]
        algorithm: HashAlgorithm,
        #[serde(default)]
        encoding: HashEncoding,
    },
    /// Payload copied to a local scratch file.
    StorageTempLocal {
        #[serde(default = "std::env::temp_dir")]
        tmp_dir: PathBuf,
        #[serde(default = "default_true")]
        ensure_dir: bool,
    },
    /// Payload uploaded to a temporary object.
    StorageTempObject {
        store: String,
        #[serde(default)]
        path: String,
    },
    /// Embedded metadata read by a long-lived exiftool worker.
    Exiftool {
        #[serde(default = "default_exiftool_program")]
        program: String,
        #[serde(default = "default_exif_read_limit")]
        read_limit: usize,
        #[serde(default = "std::env::temp_dir")]
        tmp_dir: PathBuf,
        #[serde(default = "default_true")]
        ensure_dir: bool,
    },
}

impl BranchConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            BranchConfig::SeedMetadata => "seed_metadata",
            BranchConfig::PayloadStatus => "payload_status",
            BranchConfig::FileSize => "file_size",
            BranchConfig::FileHash { .. } => "file_hash",
            BranchConfig::StorageTempLocal { .. } => "storage_temp_local",
            BranchConfig::StorageTempObject { .. } => "storage_temp_object",
            BranchConfig::Exiftool { .. } => "exiftool",
        }
    }

    /// Two branches with the same identity would write the same fields.
    pub fn identity(&self) -> String {
        match self {
            BranchConfig::FileHash { algorithm, .. } => {
                format!("{}:{}", self.kind(), algorithm.as_str())
            }
            _ => self.kind().to_string(),
        }
    }
}

/// One post-processing stage.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageConfig {
    /// Moves the scratch file from `storage_temp_local` into `dir`.
    StorageLocal {
        dir: PathBuf,
        #[serde(default = "default_true")]
        ensure_dir: bool,
        #[serde(default)]
        filename_property: Option<String>,
        #[serde(default)]
        extension_case: ExtensionCase,
    },
    /// Copies the temporary object from `storage_temp_object` under `path` in `store`.
    StorageObject {
        store: String,
        #[serde(default)]
        path: String,
        #[serde(default)]
        save_metadata: bool,
        #[serde(default)]
        skip_delete_temp: bool,
        #[serde(default)]
        filename_property: Option<String>,
        #[serde(default)]
        extension_case: ExtensionCase,
    },
}

impl StageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StageConfig::StorageLocal { .. } => "storage_local",
            StageConfig::StorageObject { .. } => "storage_object",
        }
    }

    /// The branch kind that produces the temporary resource this stage promotes.
    pub fn temp_branch(&self) -> &'static str {
        match self {
            StageConfig::StorageLocal { .. } => "storage_temp_local",
            StageConfig::StorageObject { .. } => "storage_temp_object",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_post_concurrency() -> usize {
    DEFAULT_POST_CONCURRENCY
}

fn default_exiftool_program() -> String {
    DEFAULT_EXIFTOOL_PROGRAM.to_string()
}

fn default_exif_read_limit() -> usize {
    DEFAULT_EXIF_READ_LIMIT
}

/// Load a config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

/// Load a config from a YAML file and run every validation check on it.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_full_config() {
        let yaml = r#"
post_concurrency: 2
stores:
  scratch:
    type: memory
  uploads:
    type: s3
    bucket: my-uploads
    region: eu-west-1
branches:
  - type: seed_metadata
  - type: file_size
  - type: file_hash
    algorithm: blake3
    encoding: base64
  - type: storage_temp_object
    store: scratch
    path: tmp
  - type: exiftool
    read_limit: 1024
stages:
  - type: storage_object
    store: uploads
    path: files
    save_metadata: true
    extension_case: lower
"#;

        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.post_concurrency, 2);
        assert_eq!(cfg.branches.len(), 5);
        assert_eq!(
            cfg.branches[2],
            BranchConfig::FileHash {
                algorithm: HashAlgorithm::Blake3,
                encoding: HashEncoding::Base64,
            }
        );
        match &cfg.branches[4] {
            BranchConfig::Exiftool {
                program,
                read_limit,
                ..
            } => {
                assert_eq!(program, "exiftool");
                assert_eq!(*read_limit, 1024);
            }
            other => panic!("unexpected branch {:?}", other),
        }
        assert_eq!(cfg.stages[0].kind(), "storage_object");
        assert_eq!(cfg.stores["scratch"].bucket_name("scratch"), "scratch");
        assert_eq!(cfg.stores["uploads"].bucket_name("uploads"), "my-uploads");
    }

    #[test]
    fn defaults_apply() {
        let cfg: Config = serde_yaml::from_str("branches:\n  - type: file_hash\n").unwrap();
        assert_eq!(cfg.post_concurrency, DEFAULT_POST_CONCURRENCY);
        assert!(cfg.stages.is_empty());
        assert_eq!(
            cfg.branches[0],
            BranchConfig::FileHash {
                algorithm: HashAlgorithm::Sha256,
                encoding: HashEncoding::Hex,
            }
        );
    }

    #[test]
    fn unknown_branch_type_is_a_parse_error() {
        let result: Result<Config, _> = serde_yaml::from_str("branches:\n  - type: teleport\n");
        assert!(result.is_err());
    }

    #[test]
    fn load_and_validate_reports_every_problem() {
        let yaml = r#"
post_concurrency: 0
branches:
  - type: file_size
  - type: file_size
stages:
  - type: storage_object
    store: missing
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let err = load_and_validate_config(file.path()).unwrap_err();
        match err {
            ConfigError::Invalid(errors) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation errors, got {other}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
