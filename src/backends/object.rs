// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named object stores shared by the temp-object branch and the object stage.

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{ClientOptions, ObjectStore, RetryConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::errors::ConfigError;

/// A store plus the bucket name written into record metadata.
#[derive(Clone)]
pub struct NamedStore {
    pub bucket: String,
    pub store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for NamedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedStore")
            .field("bucket", &self.bucket)
            .field("store", &self.store.to_string())
            .finish()
    }
}

/// Registry of configured stores, by name.
#[derive(Clone, Debug, Default)]
pub struct ObjectStores(BTreeMap<String, NamedStore>);

impl ObjectStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every store declared in the configuration.
    pub fn from_config(stores: &BTreeMap<String, StoreConfig>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, cfg) in stores {
            let store = create_store(name, cfg)?;
            registry.insert(name.clone(), cfg.bucket_name(name).to_string(), store);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, name: impl Into<String>, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) {
        self.0.insert(
            name.into(),
            NamedStore {
                bucket: bucket.into(),
                store,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&NamedStore> {
        self.0.get(name)
    }

    /// Look a store up by the bucket name recorded in metadata.
    pub fn by_bucket(&self, bucket: &str) -> Option<&NamedStore> {
        self.0.values().find(|s| s.bucket == bucket)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Join a key prefix and a name with a single `/`; an empty prefix yields `name`.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

fn client_options() -> ClientOptions {
    ClientOptions::new()
        .with_connect_timeout(Duration::from_secs(5))
        .with_timeout(Duration::from_secs(60))
        .with_pool_idle_timeout(Duration::from_secs(90))
}

fn retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        backoff: object_store::BackoffConfig {
            init_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            base: 2.0,
        },
        retry_timeout: Duration::from_secs(60),
    }
}

fn create_store(name: &str, cfg: &StoreConfig) -> Result<Arc<dyn ObjectStore>, ConfigError> {
    let store_error = |reason: String| ConfigError::Store {
        store: name.to_string(),
        reason,
    };

    match cfg {
        StoreConfig::Memory { .. } => Ok(Arc::new(InMemory::new())),
        StoreConfig::Local { root, ensure_dir } => {
            if *ensure_dir {
                std::fs::create_dir_all(root).map_err(|e| store_error(e.to_string()))?;
            }
            tracing::info!("Creating LocalFileSystem store '{}' at: {}", name, root.display());
            let store = LocalFileSystem::new_with_prefix(root).map_err(|e| store_error(e.to_string()))?;
            Ok(Arc::new(store))
        }
        StoreConfig::S3 {
            bucket,
            region,
            endpoint,
            allow_http,
        } => {
            tracing::info!("Creating S3 store '{}' for bucket: {}", name, bucket);
            let mut builder = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .with_client_options(client_options().with_allow_http(*allow_http))
                .with_retry(retry_config());
            if let Some(region) = region {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = endpoint {
                builder = builder.with_endpoint(endpoint);
            }
            let store = builder.build().map_err(|e| store_error(e.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}
