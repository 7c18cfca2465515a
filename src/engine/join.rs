// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ordered N-way join of per-branch results.
//!
//! Branches finish items in any order relative to each other (and to themselves:
//! item 3 can finish in one branch before item 2 does). The join buffers results
//! by item index and releases a [`ResultGroup`] only when all `arity` slots for the
//! lowest outstanding index are filled, so groups leave in strictly ascending order.
//! Arity is fixed for the lifetime of a run.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::types::{PartialResult, ResultGroup};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("result slot {slot} is out of range for {arity} branches")]
    SlotOutOfRange { slot: usize, arity: usize },

    #[error("item #{index} was already emitted")]
    Stale { index: u64 },

    #[error("slot {slot} delivered a second result for item #{index}")]
    Duplicate { index: u64, slot: usize },
}

#[derive(Debug)]
pub struct OrderedJoin {
    arity: usize,
    next_index: u64,
    pending: BTreeMap<u64, Vec<Option<PartialResult>>>,
}

impl OrderedJoin {
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            next_index: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Register an item index before any of its results arrive.
    pub fn announce(&mut self, index: u64) {
        if index >= self.next_index {
            let arity = self.arity;
            self.pending
                .entry(index)
                .or_insert_with(|| vec![None; arity]);
        }
    }

    /// Accept the result of branch `slot` for item `index`.
    pub fn accept(
        &mut self,
        index: u64,
        slot: usize,
        result: PartialResult,
    ) -> Result<(), JoinError> {
        if slot >= self.arity {
            return Err(JoinError::SlotOutOfRange {
                slot,
                arity: self.arity,
            });
        }
        if index < self.next_index {
            return Err(JoinError::Stale { index });
        }

        let arity = self.arity;
        let slots = self
            .pending
            .entry(index)
            .or_insert_with(|| vec![None; arity]);
        if slots[slot].is_some() {
            return Err(JoinError::Duplicate { index, slot });
        }
        slots[slot] = Some(result);
        Ok(())
    }

    /// The next group in index order, if it is complete.
    pub fn pop_ready(&mut self) -> Option<ResultGroup> {
        let complete = self
            .pending
            .get(&self.next_index)
            .map_or(false, |slots| slots.iter().all(Option::is_some));
        if !complete {
            return None;
        }

        let index = self.next_index;
        let slots = self.pending.remove(&index)?;
        self.next_index += 1;
        Some(ResultGroup {
            index,
            results: slots.into_iter().flatten().collect(),
        })
    }

    /// Nothing buffered or announced-but-unfinished.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every buffered, unfinished item (used when a run aborts).
    pub fn take_incomplete(&mut self) -> Vec<(u64, Vec<Option<PartialResult>>)> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}
