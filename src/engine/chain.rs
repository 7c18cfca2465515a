// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sequential, failure-aware post-processing of merged records.
//!
//! For each stage, in registration order:
//!
//! 1. every absent required field appends one `missing-field` error;
//! 2. a record with no errors is promoted, and the permanent-location fields are added;
//! 3. a temporary resource that was not consumed by the promotion is released
//!    (this is the compensating cleanup for records that carry errors);
//! 4. the temporary-resource fields are removed.
//!
//! Storage faults are appended to the record and never stop it moving through
//! the remaining stages.

use std::sync::Arc;
use tracing::Instrument;

use crate::errors::StructuredError;
use crate::observability::messages::stage::{
    StageCallFailed, StageFieldsMissing, StagePromoting, TempResourceReleased,
};
use crate::observability::messages::StructuredLog;
use crate::traits::PostStage;
use crate::types::Record;

#[derive(Clone, Default)]
pub struct PostChain {
    stages: Vec<Arc<dyn PostStage>>,
}

impl std::fmt::Debug for PostChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

impl PostChain {
    pub fn new(stages: Vec<Arc<dyn PostStage>>) -> Self {
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run `record` through every stage in order.
    pub async fn process(&self, mut record: Record) -> Record {
        for stage in &self.stages {
            record = run_stage(stage.as_ref(), record).await;
        }
        record
    }
}

/// Apply one stage to one record.
pub async fn run_stage(stage: &dyn PostStage, mut record: Record) -> Record {
    let index = record.index;

    let missing: Vec<&'static str> = stage
        .required_fields()
        .iter()
        .copied()
        .filter(|field| !record.metadata().map_or(false, |m| m.contains(field)))
        .collect();
    if !missing.is_empty() {
        StageFieldsMissing {
            stage: stage.name(),
            index,
            fields: &missing,
        }
        .log();
        record.extend_errors(
            missing
                .iter()
                .map(|field| StructuredError::missing_field(stage.name(), field)),
        );
    }

    let mut temp_consumed = false;
    if !record.has_errors() {
        let promoting = StagePromoting {
            stage: stage.name(),
            index,
        };
        promoting.log();
        let metadata = record.metadata_mut().clone();
        match stage
            .promote(&metadata)
            .instrument(promoting.span("promote"))
            .await
        {
            Ok(permanent) => {
                let target = record.metadata_mut();
                for (key, value) in permanent {
                    target.insert(key, value);
                }
                temp_consumed = stage.promote_consumes_temp();
            }
            Err(error) => {
                log_failure(stage, index, &error);
                record.push_error(error);
            }
        }
    }

    if stage.keeps_temp() {
        return record;
    }

    let temp_present = !stage.temp_fields().is_empty()
        && record
            .metadata()
            .map_or(false, |m| stage.temp_fields().iter().all(|f| m.contains(f)));
    if !temp_consumed && temp_present {
        let metadata = record.metadata_mut().clone();
        match stage.release(&metadata).await {
            Ok(()) => TempResourceReleased {
                stage: stage.name(),
                index,
            }
            .log(),
            Err(error) => {
                log_failure(stage, index, &error);
                record.push_error(error);
            }
        }
    }

    if let Some(metadata) = record.metadata.as_mut() {
        for field in stage.temp_fields() {
            metadata.remove(field);
        }
    }
    record
}

fn log_failure(stage: &dyn PostStage, index: u64, error: &StructuredError) {
    StageCallFailed {
        stage: stage.name(),
        index,
        kind: error.kind().as_str(),
        message: error.message(),
    }
    .log();
}
