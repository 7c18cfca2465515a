// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod factory;
mod loader;
mod runtime;
mod validation;

pub mod consts;

pub use factory::{prepare_directory, BranchFactory, Components, StageFactory};
pub use loader::{
    load_and_validate_config, load_config, BranchConfig, Config, ExtensionCase, HashAlgorithm,
    HashEncoding, StageConfig, StoreConfig,
};
pub use runtime::{Runtime, RuntimeBuilder};
pub use validation::validate_config;
