// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The streaming engine: payload fan-out, ordered join, merge, post chain and output.

pub mod broadcast;
pub mod chain;
pub mod encoder;
pub mod join;
pub mod merge;
pub mod pipeline;


pub use chain::PostChain;
pub use encoder::JsonArrayEncoder;
pub use join::{JoinError, OrderedJoin};
pub use merge::merge_group;
pub use pipeline::{Pipeline, RunSummary};
