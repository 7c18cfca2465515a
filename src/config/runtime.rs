// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use object_store::ObjectStore;
use std::sync::Arc;

use crate::backends::branches::PayloadStatusBranch;
use crate::backends::object::ObjectStores;
use crate::backends::stages::FilenameFn;
use crate::config::factory::{BranchFactory, Components, StageFactory};
use crate::config::{validate_config, BranchConfig, Config};
use crate::engine::{Pipeline, PostChain};
use crate::errors::ConfigError;
use crate::traits::{Branch, MetadataExtractor};

/// A ready-to-run pipeline plus the long-lived workers it owns.
pub struct Runtime {
    pipeline: Pipeline,
    extractors: Vec<Arc<dyn MetadataExtractor>>,
}

impl Runtime {
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Stop every metadata-extraction worker.
    pub async fn shutdown(&self) {
        for extractor in &self.extractors {
            extractor.shutdown().await;
        }
    }
}

/// Upload runtime builder - turns a configuration into branches, a post chain and a pipeline.
///
/// Stores and extractors can be injected before building; injected stores replace
/// the configured store of the same name.
///
/// # Examples
///
/// ## Building runtime from configuration
/// ```
/// use stream_upload::config::{Config, RuntimeBuilder};
///
/// let config: Config = serde_yaml::from_str("branches:\n  - type: file_size\n").unwrap();
/// let runtime = RuntimeBuilder::from_config(&config).unwrap();
///
/// // `payload_status` is registered first when the configuration omits it
/// assert_eq!(runtime.pipeline().branch_names(), vec!["payload_status", "file_size"]);
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    filename_fn: Option<FilenameFn>,
    stores: Vec<(String, String, Arc<dyn ObjectStore>)>,
    extractor: Option<Arc<dyn MetadataExtractor>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build with no injected resources.
    pub fn from_config(cfg: &Config) -> Result<Runtime, ConfigError> {
        Self::new().build(cfg)
    }

    /// Name promoted files programmatically; takes precedence over `filename_property`.
    pub fn with_filename_fn(mut self, filename_fn: FilenameFn) -> Self {
        self.filename_fn = Some(filename_fn);
        self
    }

    /// Use `store` for the configured store `name`, reporting it as `bucket`.
    pub fn with_store(mut self, name: impl Into<String>, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.stores.push((name.into(), bucket.into(), store));
        self
    }

    /// Use `extractor` for every `exiftool` branch instead of spawning workers.
    pub fn with_extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn build(self, cfg: &Config) -> Result<Runtime, ConfigError> {
        validate_config(cfg).map_err(ConfigError::Invalid)?;

        let mut stores = ObjectStores::from_config(&cfg.stores)?;
        for (name, bucket, store) in self.stores {
            stores.insert(name, bucket, store);
        }

        let mut components = Components::new(stores);
        components.filename_fn = self.filename_fn;
        components.extractor_override = self.extractor;

        let mut branches: Vec<Arc<dyn Branch>> = Vec::with_capacity(cfg.branches.len() + 1);
        if !cfg.branches.iter().any(|b| matches!(b, BranchConfig::PayloadStatus)) {
            branches.push(Arc::new(PayloadStatusBranch));
        }
        for branch in &cfg.branches {
            branches.push(BranchFactory::create_branch(branch, &mut components)?);
        }

        let stages = cfg
            .stages
            .iter()
            .map(|stage| StageFactory::create_stage(stage, &components))
            .collect::<Result<Vec<_>, _>>()?;

        let pipeline = Pipeline::new(branches, PostChain::new(stages)).with_post_concurrency(cfg.post_concurrency);

        Ok(Runtime {
            pipeline,
            extractors: components.extractors(),
        })
    }
}
