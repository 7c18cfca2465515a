// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The upload pipeline: source → fan-out → branches → join → merge → post chain → encoder.
//!
//! Three cooperating parts run per call to [`Pipeline::run`]:
//!
//! * **ingest** (spawned) pulls items from the source one at a time, spawns one task
//!   per branch with a [`broadcast`] reader each, then pumps the item's body through
//!   the broadcast sender before asking for the next item. Items pipeline because
//!   branch tasks of item *i* may still be running while item *i + 1* is pumped.
//! * **join** (spawned) collects branch outcomes, aligns them by index with
//!   [`OrderedJoin`], merges complete groups and forwards them in order.
//! * the **caller's task** runs up to `post_concurrency` records through the
//!   [`PostChain`] at once, keeping their order, and writes them to the encoder.
//!
//! A fatal error (malformed source before the first item, a branch breaking its
//! one-result contract) aborts the run. Items that were still incomplete are run
//! through the chain with an `aborted` error so their temporary resources are
//! released, and nothing more is encoded.

use futures::stream::FuturesOrdered;
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::consts::{DEFAULT_POST_CONCURRENCY, INTAKE_QUEUE_CAPACITY};
use crate::engine::broadcast::{self, PayloadReader, PayloadSender};
use crate::engine::chain::PostChain;
use crate::engine::encoder::JsonArrayEncoder;
use crate::engine::join::OrderedJoin;
use crate::engine::merge::merge_group;
use crate::errors::{ErrorKind, PayloadError, RunError, StructuredError};
use crate::observability::messages::branch::{BranchPanicked, BranchReportedErrors, OutcomeDiscarded};
use crate::observability::messages::pipeline::{
    ItemAccepted, RecordEncoded, RunAborted, RunCompleted, RunStarted, SourceEndedEarly,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Branch, ItemSource, PayloadStream, SourceItem};
use crate::types::{BranchItem, PartialResult, Record, ResultGroup};

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records written to the output array.
    pub items: u64,
    /// How many of them carry at least one error.
    pub records_with_errors: u64,
}

/// Events flowing from ingest and branch tasks into the join.
enum Intake {
    Announce(u64),
    Outcome {
        index: u64,
        slot: usize,
        result: Result<PartialResult, String>,
    },
    SourceFailed(RunError),
}

/// Events flowing from the join to the post-processing loop.
enum Flow {
    Record(Record),
    Abort {
        error: RunError,
        leftovers: Vec<Record>,
    },
}

pub struct Pipeline {
    branches: Vec<Arc<dyn Branch>>,
    chain: PostChain,
    post_concurrency: usize,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("branches", &self.branch_names())
            .field("chain", &self.chain)
            .field("post_concurrency", &self.post_concurrency)
            .finish()
    }
}

impl Pipeline {
    /// Branch order is registration order: it fixes result-group order and
    /// therefore merge precedence.
    pub fn new(branches: Vec<Arc<dyn Branch>>, chain: PostChain) -> Self {
        Self {
            branches,
            chain,
            post_concurrency: DEFAULT_POST_CONCURRENCY,
        }
    }

    /// Number of records allowed in the post chain at once (at least one).
    pub fn with_post_concurrency(mut self, post_concurrency: usize) -> Self {
        self.post_concurrency = post_concurrency.max(1);
        self
    }

    pub fn branch_names(&self) -> Vec<&'static str> {
        self.branches.iter().map(|b| b.name()).collect()
    }

    pub fn chain(&self) -> &PostChain {
        &self.chain
    }

    /// Process every item of `source` and stream the JSON array into `sink`.
    pub async fn run<S, W>(&self, source: S, sink: W) -> Result<RunSummary, RunError>
    where
        S: ItemSource + 'static,
        W: AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let branch_names = self.branch_names();
        let stage_names = self.chain.stage_names();
        let run_started = RunStarted {
            branches: &branch_names,
            stages: &stage_names,
            post_concurrency: self.post_concurrency,
        };
        run_started.log();
        let span = run_started.span("run");

        let (intake_tx, intake_rx) = mpsc::channel(INTAKE_QUEUE_CAPACITY);
        let (flow_tx, mut flow_rx) = mpsc::channel(self.post_concurrency);

        let stop = CancellationToken::new();

        tokio::spawn(
            ingest(source, self.branches.clone(), intake_tx, stop.clone()).instrument(span.clone()),
        );
        tokio::spawn(
            join_results(branch_names.clone(), intake_rx, flow_tx, stop).instrument(span.clone()),
        );

        let mut encoder = JsonArrayEncoder::new(sink);
        let mut in_flight = FuturesOrdered::new();
        let mut summary = RunSummary::default();
        let mut flow_open = true;

        let abort = loop {
            if !flow_open && in_flight.is_empty() {
                break None;
            }

            tokio::select! {
                Some(record) = in_flight.next(), if !in_flight.is_empty() => {
                    let record: Record = record;
                    let bytes = encoder.write_record(&record).await?;
                    RecordEncoded {
                        index: record.index,
                        error_count: record.errors().len(),
                        bytes,
                    }
                    .log();
                    summary.items += 1;
                    if record.has_errors() {
                        summary.records_with_errors += 1;
                    }
                }
                flow = flow_rx.recv(), if flow_open && in_flight.len() < self.post_concurrency => {
                    match flow {
                        Some(Flow::Record(record)) => in_flight.push_back(self.chain.process(record)),
                        Some(Flow::Abort { error, leftovers }) => break Some((error, leftovers)),
                        None => flow_open = false,
                    }
                }
                else => break None,
            }
        };

        if let Some((error, leftovers)) = abort {
            // Records already inside the chain finish their storage work unreported.
            while in_flight.next().await.is_some() {}

            RunAborted {
                error: &error,
                cleanup_records: leftovers.len(),
            }
            .log();
            for record in leftovers {
                self.chain.process(record).instrument(span.clone()).await;
            }

            if !encoder.has_started() {
                encoder.write_fatal(&error).await?;
            }
            return Err(error);
        }

        encoder.finish().await?;
        RunCompleted {
            items: summary.items,
            records_with_errors: summary.records_with_errors,
            duration: started.elapsed(),
        }
        .log();
        Ok(summary)
    }
}

/// Pull items one by one, fan each one out and pump its body to completion.
///
/// Cancelling `stop` ends the current body with a fault and takes no further items.
async fn ingest<S: ItemSource>(
    mut source: S,
    branches: Vec<Arc<dyn Branch>>,
    intake: mpsc::Sender<Intake>,
    stop: CancellationToken,
) {
    let mut index = 0u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            next = source.next_item() => next,
        };
        let SourceItem { metadata, body } = match next {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(error) if index == 0 => {
                let _ = intake.send(Intake::SourceFailed(error)).await;
                break;
            }
            Err(error) => {
                SourceEndedEarly {
                    items: index,
                    error: &error,
                }
                .log();
                break;
            }
        };

        ItemAccepted {
            index,
            filename: metadata.filename(),
            has_payload: body.is_some(),
        }
        .log();

        if intake.send(Intake::Announce(index)).await.is_err() {
            break;
        }

        let metadata = Arc::new(metadata);
        let (sender, readers): (Option<PayloadSender>, Vec<Option<PayloadReader>>) =
            if body.is_some() {
                let (sender, readers) = broadcast::channel(branches.len());
                (Some(sender), readers.into_iter().map(Some).collect())
            } else {
                (None, branches.iter().map(|_| None).collect())
            };

        for (slot, (branch, payload)) in branches.iter().zip(readers).enumerate() {
            spawn_branch(
                branch.clone(),
                BranchItem {
                    index,
                    metadata: metadata.clone(),
                    payload,
                },
                slot,
                intake.clone(),
            );
        }

        if let (Some(sender), Some(body)) = (sender, body) {
            pump(body, sender, &stop).await;
        }
        index += 1;
    }
}

/// Move one item's body into the broadcast, honouring its backpressure.
async fn pump(mut body: PayloadStream, mut sender: PayloadSender, stop: &CancellationToken) {
    loop {
        let chunk = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                sender.fail(PayloadError::SourceDropped).await;
                return;
            }
            chunk = body.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => sender.send(bytes).await,
            Some(Err(error)) => {
                sender.fail(error).await;
                return;
            }
            None => break,
        }
    }
    sender.finish().await;
}

fn spawn_branch(
    branch: Arc<dyn Branch>,
    item: BranchItem,
    slot: usize,
    intake: mpsc::Sender<Intake>,
) {
    let index = item.index;
    let span = tracing::debug_span!("branch", branch = branch.name(), index);
    tokio::spawn(
        async move {
            let result = AssertUnwindSafe(branch.process(item))
                .catch_unwind()
                .await
                .map_err(panic_message);
            let _ = intake.send(Intake::Outcome { index, slot, result }).await;
        }
        .instrument(span),
    );
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "branch panicked".to_string()
    }
}

/// Align outcomes into groups, merge them and forward records in index order.
async fn join_results(
    branch_names: Vec<&'static str>,
    mut intake: mpsc::Receiver<Intake>,
    flow: mpsc::Sender<Flow>,
    stop: CancellationToken,
) {
    let arity = branch_names.len();
    let name_of = |slot: usize| branch_names.get(slot).copied().unwrap_or("<unknown>");
    let mut join = OrderedJoin::new(arity);
    let mut fatal = None;

    while let Some(event) = intake.recv().await {
        match event {
            Intake::Announce(index) => join.announce(index),
            Intake::Outcome {
                index,
                slot,
                result: Ok(partial),
            } => {
                if let Some(errors) = partial.errors.as_ref().filter(|e| !e.is_empty()) {
                    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                    BranchReportedErrors {
                        branch: name_of(slot),
                        index,
                        messages: &messages,
                    }
                    .log();
                }
                if let Err(error) = join.accept(index, slot, partial) {
                    fatal = Some(RunError::BranchContract {
                        branch: name_of(slot).to_string(),
                        index,
                        reason: error.to_string(),
                    });
                    break;
                }
            }
            Intake::Outcome {
                index,
                slot,
                result: Err(reason),
            } => {
                BranchPanicked {
                    branch: name_of(slot),
                    index,
                    reason: &reason,
                }
                .log();
                fatal = Some(RunError::BranchContract {
                    branch: name_of(slot).to_string(),
                    index,
                    reason: format!("panicked without a result: {}", reason),
                });
                break;
            }
            Intake::SourceFailed(error) => {
                fatal = Some(error);
                break;
            }
        }

        while let Some(group) = join.pop_ready() {
            if flow.send(Flow::Record(merge_group(group, arity))).await.is_err() {
                return;
            }
        }
    }

    if fatal.is_none() && !join.is_idle() {
        fatal = Some(RunError::InternalError {
            message: "branch results stopped before every item was complete".to_string(),
        });
    }

    if let Some(error) = fatal {
        stop.cancel();
        settle_outstanding(&mut join, &mut intake, &name_of).await;

        let leftovers = join
            .take_incomplete()
            .into_iter()
            .map(|(index, slots)| aborted_record(index, slots))
            .collect();
        let _ = flow.send(Flow::Abort { error, leftovers }).await;
    }
}

/// Collect the outcomes of branch tasks that are still running once the run is
/// aborting, so temporary resources they created reach the chain. Returns when
/// ingest and every branch task have dropped their intake handles.
async fn settle_outstanding(
    join: &mut OrderedJoin,
    intake: &mut mpsc::Receiver<Intake>,
    name_of: &impl Fn(usize) -> &'static str,
) {
    while let Some(event) = intake.recv().await {
        match event {
            Intake::Announce(index) => join.announce(index),
            Intake::Outcome {
                index,
                slot,
                result: Ok(partial),
            } => {
                if let Err(error) = join.accept(index, slot, partial) {
                    OutcomeDiscarded {
                        branch: name_of(slot),
                        index,
                        reason: &error.to_string(),
                    }
                    .log();
                }
            }
            Intake::Outcome {
                index,
                slot,
                result: Err(reason),
            } => BranchPanicked {
                branch: name_of(slot),
                index,
                reason: &reason,
            }
            .log(),
            Intake::SourceFailed(_) => {}
        }
    }
}

/// Merge whatever arrived for an unfinished item and mark it aborted.
fn aborted_record(index: u64, slots: Vec<Option<PartialResult>>) -> Record {
    let results: Vec<PartialResult> = slots.into_iter().flatten().collect();
    let arity = results.len();
    let mut record = merge_group(ResultGroup { index, results }, arity);
    record.push_error(StructuredError::new(
        ErrorKind::Aborted,
        format!("Run aborted before item #{} completed", index),
    ));
    record
}
