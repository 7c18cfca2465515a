// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! All checks run and every problem is reported at once:
//!
//! 1. **Limits**: `post_concurrency` and extractor read limits must be non-zero
//! 2. **Uniqueness**: no two branches may write the same fields
//! 3. **Store references**: every `store` named by a branch or stage is declared
//! 4. **Temp handoff**: every persistence stage has the branch that creates its
//!    temporary resource
//!
//! ```rust
//! use stream_upload::config::{validate_config, Config};
//!
//! let config: Config = serde_yaml::from_str(
//!     "branches:\n  - type: file_size\nstages:\n  - type: storage_local\n    dir: /srv/uploads\n",
//! )
//! .unwrap();
//!
//! let errors = validate_config(&config).unwrap_err();
//! assert_eq!(errors.len(), 1);
//! ```

use std::collections::HashSet;

use crate::config::{BranchConfig, Config, StageConfig};
use crate::errors::ValidationError;

pub fn validate_config(cfg: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_limits(cfg, &mut errors);
    validate_unique_branches(cfg, &mut errors);
    validate_store_references(cfg, &mut errors);
    validate_temp_handoff(cfg, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_limits(cfg: &Config, errors: &mut Vec<ValidationError>) {
    if cfg.post_concurrency == 0 {
        errors.push(ValidationError::ZeroLimit {
            setting: "post_concurrency".to_string(),
        });
    }
    for branch in &cfg.branches {
        if let BranchConfig::Exiftool { read_limit: 0, .. } = branch {
            errors.push(ValidationError::ZeroLimit {
                setting: "exiftool.read_limit".to_string(),
            });
        }
    }
}

fn validate_unique_branches(cfg: &Config, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for branch in &cfg.branches {
        let identity = branch.identity();
        if !seen.insert(identity.clone()) {
            errors.push(ValidationError::DuplicateBranch { branch: identity });
        }
    }
}

fn validate_store_references(cfg: &Config, errors: &mut Vec<ValidationError>) {
    let branch_stores = cfg.branches.iter().filter_map(|b| match b {
        BranchConfig::StorageTempObject { store, .. } => Some((b.kind(), store)),
        _ => None,
    });
    let stage_stores = cfg.stages.iter().filter_map(|s| match s {
        StageConfig::StorageObject { store, .. } => Some((s.kind(), store)),
        _ => None,
    });

    for (component, store) in branch_stores.chain(stage_stores) {
        if !cfg.stores.contains_key(store) {
            errors.push(ValidationError::UnknownStore {
                component: component.to_string(),
                store: store.clone(),
            });
        }
    }
}

fn validate_temp_handoff(cfg: &Config, errors: &mut Vec<ValidationError>) {
    let branch_kinds: HashSet<&str> = cfg.branches.iter().map(|b| b.kind()).collect();
    for stage in &cfg.stages {
        if !branch_kinds.contains(stage.temp_branch()) {
            errors.push(ValidationError::MissingTempBranch {
                stage: stage.kind().to_string(),
                required_branch: stage.temp_branch().to_string(),
            });
        }
    }
}
