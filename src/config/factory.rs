// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::backends::branches::{
    FileHashBranch, FileSizeBranch, PayloadStatusBranch, SeedMetadataBranch, TempLocalBranch, TempObjectBranch,
};
use crate::backends::exif::{ExifBranch, ExiftoolProcess};
use crate::backends::object::{NamedStore, ObjectStores};
use crate::backends::stages::{FilenameFn, FilenamePolicy, LocalStorageStage, ObjectStorageStage};
use crate::config::{BranchConfig, StageConfig};
use crate::errors::ConfigError;
use crate::observability::messages::stage::DirectoryReady;
use crate::traits::{Branch, MetadataExtractor, PostStage};

/// Shared resources handed to every branch and stage built for one runtime.
pub struct Components {
    pub stores: ObjectStores,
    pub filename_fn: Option<FilenameFn>,
    /// Used for every `exiftool` branch when set, instead of spawning workers.
    pub extractor_override: Option<Arc<dyn MetadataExtractor>>,
    extractors: BTreeMap<String, Arc<dyn MetadataExtractor>>,
}

impl Components {
    pub fn new(stores: ObjectStores) -> Self {
        Self {
            stores,
            filename_fn: None,
            extractor_override: None,
            extractors: BTreeMap::new(),
        }
    }

    /// One extractor per program, shared by every branch that names it.
    fn extractor(&mut self, program: &str) -> Arc<dyn MetadataExtractor> {
        if let Some(extractor) = &self.extractor_override {
            return extractor.clone();
        }
        self.extractors
            .entry(program.to_string())
            .or_insert_with(|| Arc::new(ExiftoolProcess::new(program)))
            .clone()
    }

    /// Every extractor handed out so far, for shutdown.
    pub fn extractors(&self) -> Vec<Arc<dyn MetadataExtractor>> {
        match &self.extractor_override {
            Some(extractor) => vec![extractor.clone()],
            None => self.extractors.values().cloned().collect(),
        }
    }

    fn store(&self, name: &str) -> Result<NamedStore, ConfigError> {
        self.stores.get(name).cloned().ok_or_else(|| ConfigError::Store {
            store: name.to_string(),
            reason: "store is not declared".to_string(),
        })
    }

    fn filename_policy(&self, property: &Option<String>, extension_case: crate::config::ExtensionCase) -> FilenamePolicy {
        let policy = FilenamePolicy::new(property.clone(), extension_case);
        match &self.filename_fn {
            Some(filename_fn) => policy.with_filename_fn(filename_fn.clone()),
            None => policy,
        }
    }
}

/// Factory for creating fan-out branches from configuration
pub struct BranchFactory;

impl BranchFactory {
    pub fn create_branch(cfg: &BranchConfig, components: &mut Components) -> Result<Arc<dyn Branch>, ConfigError> {
        let branch: Arc<dyn Branch> = match cfg {
            BranchConfig::SeedMetadata => Arc::new(SeedMetadataBranch),
            BranchConfig::PayloadStatus => Arc::new(PayloadStatusBranch),
            BranchConfig::FileSize => Arc::new(FileSizeBranch),
            BranchConfig::FileHash { algorithm, encoding } => Arc::new(FileHashBranch::new(*algorithm, *encoding)),
            BranchConfig::StorageTempLocal { tmp_dir, ensure_dir } => {
                prepare_directory("Scratch", tmp_dir, *ensure_dir)?;
                Arc::new(TempLocalBranch::new(tmp_dir))
            }
            BranchConfig::StorageTempObject { store, path } => {
                Arc::new(TempObjectBranch::new(components.store(store)?, path.clone()))
            }
            BranchConfig::Exiftool {
                program,
                read_limit,
                tmp_dir,
                ensure_dir,
            } => {
                prepare_directory("Scratch", tmp_dir, *ensure_dir)?;
                Arc::new(ExifBranch::new(components.extractor(program), *read_limit, tmp_dir))
            }
        };
        Ok(branch)
    }
}

/// Factory for creating post-processing stages from configuration
pub struct StageFactory;

impl StageFactory {
    pub fn create_stage(cfg: &StageConfig, components: &Components) -> Result<Arc<dyn PostStage>, ConfigError> {
        let stage: Arc<dyn PostStage> = match cfg {
            StageConfig::StorageLocal {
                dir,
                ensure_dir,
                filename_property,
                extension_case,
            } => {
                prepare_directory("Storage", dir, *ensure_dir)?;
                Arc::new(LocalStorageStage::new(
                    dir,
                    components.filename_policy(filename_property, *extension_case),
                ))
            }
            StageConfig::StorageObject {
                store,
                path,
                save_metadata,
                skip_delete_temp,
                filename_property,
                extension_case,
            } => Arc::new(
                ObjectStorageStage::new(
                    components.store(store)?,
                    components.stores.clone(),
                    path.clone(),
                    components.filename_policy(filename_property, *extension_case),
                )
                .with_save_metadata(*save_metadata)
                .with_skip_delete_temp(*skip_delete_temp),
            ),
        };
        Ok(stage)
    }
}

/// Make sure `path` is a writable directory, creating it when `ensure_dir` is set.
pub fn prepare_directory(role: &str, path: &Path, ensure_dir: bool) -> Result<(), ConfigError> {
    let unusable = |reason: String| ConfigError::DirectoryUnusable {
        path: path.to_path_buf(),
        reason,
    };

    let mut created = false;
    if !path.exists() {
        if !ensure_dir {
            return Err(unusable("directory does not exist".to_string()));
        }
        std::fs::create_dir_all(path).map_err(|e| unusable(e.to_string()))?;
        created = true;
    }
    if !path.is_dir() {
        return Err(unusable("not a directory".to_string()));
    }

    let probe = path.join(format!(".write-probe-{}", Uuid::new_v4()));
    std::fs::write(&probe, b"").map_err(|e| unusable(format!("not writable: {}", e)))?;
    let _ = std::fs::remove_file(&probe);

    tracing::info!("{}", DirectoryReady { role, path, created });
    Ok(())
}
