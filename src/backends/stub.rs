// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test doubles for branches, stages and the metadata extractor.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::errors::{ErrorKind, ExtractError, StructuredError};
use crate::traits::{Branch, MetadataExtractor, PostStage};
use crate::types::{fields, BranchItem, Metadata, PartialResult};

/// A branch that ignores the payload and answers with a fixed result,
/// optionally after a per-item delay.
pub struct StubBranch {
    pub name: &'static str,
    pub result: PartialResult,
    pub delay: Option<Box<dyn Fn(u64) -> Duration + Send + Sync>>,
}

impl StubBranch {
    pub fn new(name: &'static str, result: PartialResult) -> Self {
        Self {
            name,
            result,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: impl Fn(u64) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }
}

#[async_trait]
impl Branch for StubBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        if let Some(reader) = item.payload {
            reader.abandon();
        }
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(item.index)).await;
        }
        self.result.clone()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Reads at most `limit` bytes, then abandons the payload.
pub struct PrefixBranch {
    pub limit: usize,
}

#[async_trait]
impl Branch for PrefixBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        let Some(mut reader) = item.payload else {
            return PartialResult::with_error(StructuredError::invalid_input("no payload"));
        };

        let mut read = 0usize;
        while read < self.limit {
            match reader.next_chunk().await {
                Ok(Some(chunk)) => read += chunk.len(),
                Ok(None) | Err(_) => break,
            }
        }
        reader.abandon();
        PartialResult::with_metadata([("prefixBytes", json!(read.min(self.limit)))].into_iter().collect())
    }

    fn name(&self) -> &'static str {
        "prefix"
    }
}

/// A branch that panics instead of answering, for every item or just one.
#[derive(Default)]
pub struct PanickingBranch {
    pub only_index: Option<u64>,
    pub delay: Duration,
}

impl PanickingBranch {
    pub fn always() -> Self {
        Self::default()
    }

    /// Answer with an empty result except for item `index`, which panics after `delay`.
    pub fn on_item(index: u64, delay: Duration) -> Self {
        Self {
            only_index: Some(index),
            delay,
        }
    }
}

#[async_trait]
impl Branch for PanickingBranch {
    async fn process(&self, item: BranchItem) -> PartialResult {
        if let Some(reader) = item.payload {
            reader.abandon();
        }
        if self.only_index.map_or(false, |i| i != item.index) {
            return PartialResult::empty();
        }
        tokio::time::sleep(self.delay).await;
        panic!("simulated branch failure");
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StubStageBehavior {
    Succeed,
    FailPromote,
    FailRelease,
}

/// A persistence stage over `filename` + `localTmpFilepath` that only counts calls.
pub struct StubStage {
    name: &'static str,
    behavior: StubStageBehavior,
    consumes: bool,
    keeps: bool,
    promotions: AtomicUsize,
    releases: AtomicUsize,
}

impl StubStage {
    pub fn new(behavior: StubStageBehavior) -> Self {
        Self::named("stub", behavior)
    }

    pub fn named(name: &'static str, behavior: StubStageBehavior) -> Self {
        Self {
            name,
            behavior,
            consumes: false,
            keeps: false,
            promotions: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn consuming(mut self) -> Self {
        self.consumes = true;
        self
    }

    pub fn keeping_temp(mut self) -> Self {
        self.keeps = true;
        self
    }

    pub fn promotions(&self) -> usize {
        self.promotions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostStage for StubStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &[fields::FILENAME, fields::LOCAL_TMP_FILEPATH]
    }

    fn temp_fields(&self) -> &'static [&'static str] {
        &[fields::LOCAL_TMP_FILEPATH]
    }

    async fn promote(&self, metadata: &Metadata) -> Result<Metadata, StructuredError> {
        self.promotions.fetch_add(1, Ordering::SeqCst);
        if self.behavior == StubStageBehavior::FailPromote {
            return Err(StructuredError::new(
                ErrorKind::UpstreamCopyFailure,
                "simulated copy failure",
            ));
        }
        let filename = metadata.filename().unwrap_or_default();
        Ok([("stubLocation", json!(format!("permanent/{}", filename)))]
            .into_iter()
            .collect())
    }

    async fn release(&self, _metadata: &Metadata) -> Result<(), StructuredError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.behavior == StubStageBehavior::FailRelease {
            return Err(StructuredError::new(
                ErrorKind::UpstreamDeleteFailure,
                "simulated delete failure",
            ));
        }
        Ok(())
    }

    fn promote_consumes_temp(&self) -> bool {
        self.consumes
    }

    fn keeps_temp(&self) -> bool {
        self.keeps
    }
}

/// Extractor that answers with a canned document and records what it was asked.
pub struct StubExtractor {
    pub answer: Result<Value, ExtractError>,
    /// When set, the answer's `SourceFile` is overwritten with the requested path.
    pub echo_source: bool,
    pub requested: Mutex<Vec<PathBuf>>,
}

impl StubExtractor {
    pub fn answering(answer: Value) -> Self {
        Self {
            answer: Ok(answer),
            echo_source: true,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ExtractError) -> Self {
        Self {
            answer: Err(error),
            echo_source: false,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<PathBuf> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataExtractor for StubExtractor {
    async fn extract(&self, path: &Path) -> Result<Value, ExtractError> {
        self.requested.lock().unwrap().push(path.to_path_buf());
        let mut answer = self.answer.clone()?;
        if self.echo_source {
            if let Value::Object(map) = &mut answer {
                map.insert(
                    "SourceFile".to_string(),
                    json!(path.to_string_lossy().to_string()),
                );
            }
        }
        Ok(answer)
    }

    fn program(&self) -> &str {
        "stub-extractor"
    }
}
