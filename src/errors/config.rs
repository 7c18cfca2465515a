// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during pipeline configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A branch or stage names an object store that is not declared
    UnknownStore {
        /// The branch or stage type referencing the store
        component: String,
        /// The missing store name
        store: String,
    },
    /// A persistence stage has no branch producing the temporary resource it promotes
    MissingTempBranch {
        /// The stage that needs the temporary resource
        stage: String,
        /// The branch type that would produce it
        required_branch: String,
    },
    /// The same branch kind is registered more than once
    DuplicateBranch {
        /// The duplicated branch type
        branch: String,
    },
    /// A read limit or chunk size of zero would stall or starve a branch
    ZeroLimit {
        /// The offending setting
        setting: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownStore { component, store } => {
                write!(
                    f,
                    "'{}' references object store '{}' which is not declared",
                    component, store
                )
            }
            ValidationError::MissingTempBranch {
                stage,
                required_branch,
            } => {
                write!(
                    f,
                    "Stage '{}' requires a '{}' branch to produce its temporary resource",
                    stage, required_branch
                )
            }
            ValidationError::DuplicateBranch { branch } => {
                write!(f, "Duplicate branch: '{}'", branch)
            }
            ValidationError::ZeroLimit { setting } => {
                write!(f, "Setting '{}' must be greater than zero", setting)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading a configuration or building a runtime from it.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation failed:\n{}", join_lines(.0))]
    Invalid(Vec<ValidationError>),

    /// The scratch or permanent directory is missing or not writable.
    #[error("Directory '{path}' is not usable: {reason}")]
    DirectoryUnusable { path: PathBuf, reason: String },

    #[error("Failed to create object store '{store}': {reason}")]
    Store { store: String, reason: String },
}

fn join_lines(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
