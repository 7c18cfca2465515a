// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod branch;
pub mod extractor;
pub mod source;
pub mod stage;

pub use branch::Branch;
pub use extractor::MetadataExtractor;
pub use source::{ItemSource, PayloadStream, SourceItem};
pub use stage::PostStage;
