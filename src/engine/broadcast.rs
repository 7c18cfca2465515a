// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Single-producer, multi-consumer broadcast of one item's byte payload.
//!
//! Every branch gets a [`PayloadReader`] over the *same* chunks (`Bytes` clones are
//! reference-counted, never copied). Delivery is gated by a single low-water mark:
//! the [`PayloadSender`] holds at most one published chunk, and only publishes the
//! next one once every attached reader has taken the current one. A slow reader
//! therefore paces the whole item.
//!
//! Readers that only need a prefix must call [`PayloadReader::abandon`] (or
//! [`PayloadReader::drain`]) once they have enough. Dropping a reader also detaches
//! it, so an ignored payload never stalls its siblings. When no reader is attached
//! the sender accepts chunks immediately, which keeps the upstream source draining.

use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::errors::PayloadError;

#[derive(Debug, Clone)]
enum End {
    Finished,
    Failed(PayloadError),
}

struct State {
    /// Most recently published chunk.
    chunk: Option<Bytes>,
    /// Number of chunks published so far.
    published: u64,
    /// Attached readers that have not yet taken `chunk`.
    pending: usize,
    /// Chunks consumed per reader; `None` once the reader detached.
    cursors: Vec<Option<u64>>,
    end: Option<End>,
}

struct Shared {
    state: Mutex<State>,
    /// Woken on publish and on end-of-payload.
    published: Notify,
    /// Woken when `pending` drops to zero.
    drained: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn end_with(&self, end: End) {
        {
            let mut state = self.lock();
            if state.end.is_none() {
                state.end = Some(end);
            }
            state.chunk = None;
        }
        self.published.notify_waiters();
    }
}

/// Create a broadcast with a fixed number of readers, all attached before the
/// first chunk flows.
pub fn channel(readers: usize) -> (PayloadSender, Vec<PayloadReader>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            chunk: None,
            published: 0,
            pending: 0,
            cursors: vec![Some(0); readers],
            end: None,
        }),
        published: Notify::new(),
        drained: Notify::new(),
    });

    let readers = (0..readers)
        .map(|slot| PayloadReader {
            shared: shared.clone(),
            slot,
            attached: true,
        })
        .collect();

    (
        PayloadSender {
            shared,
            closed: false,
        },
        readers,
    )
}

/// Producer half. Dropped without `finish`/`fail`, readers see [`PayloadError::SourceDropped`].
pub struct PayloadSender {
    shared: Arc<Shared>,
    closed: bool,
}

impl PayloadSender {
    /// Publish `chunk` once every attached reader has taken the previous one.
    ///
    /// Cancel-safe: nothing is published until the wait completes.
    pub async fn send(&mut self, chunk: Bytes) {
        self.wait_drained().await;

        {
            let mut state = self.shared.lock();
            state.published += 1;
            state.pending = state.cursors.iter().filter(|c| c.is_some()).count();
            state.chunk = Some(chunk);
        }
        self.shared.published.notify_waiters();
    }

    /// End the payload cleanly after the last chunk has been taken.
    pub async fn finish(mut self) {
        self.wait_drained().await;
        self.closed = true;
        self.shared.end_with(End::Finished);
    }

    /// End the payload with a fault; every attached reader observes it.
    pub async fn fail(mut self, error: PayloadError) {
        self.wait_drained().await;
        self.closed = true;
        self.shared.end_with(End::Failed(error));
    }

    /// Number of readers still attached.
    pub fn attached(&self) -> usize {
        self.shared
            .lock()
            .cursors
            .iter()
            .filter(|c| c.is_some())
            .count()
    }

    async fn wait_drained(&self) {
        loop {
            let drained = self.shared.drained.notified();
            if self.shared.lock().pending == 0 {
                return;
            }
            drained.await;
        }
    }
}

impl Drop for PayloadSender {
    fn drop(&mut self) {
        if !self.closed {
            self.shared.end_with(End::Failed(PayloadError::SourceDropped));
        }
    }
}

/// One consumer's view of the payload.
pub struct PayloadReader {
    shared: Arc<Shared>,
    slot: usize,
    attached: bool,
}

impl PayloadReader {
    /// Next chunk, `Ok(None)` at end of payload, or the payload's fault.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, PayloadError> {
        if !self.attached {
            return Ok(None);
        }

        loop {
            let published = self.shared.published.notified();

            let (outcome, drained) = {
                let mut state = self.shared.lock();
                let cursor = state.cursors[self.slot].unwrap_or(state.published);

                if cursor < state.published && state.chunk.is_some() {
                    let chunk = state.chunk.clone();
                    let published_count = state.published;
                    state.cursors[self.slot] = Some(published_count);
                    state.pending -= 1;
                    (Some(Ok(chunk)), state.pending == 0)
                } else {
                    match &state.end {
                        Some(End::Finished) => (Some(Ok(None)), false),
                        Some(End::Failed(error)) => (Some(Err(error.clone())), false),
                        None => (None, false),
                    }
                }
            };

            if drained {
                self.shared.drained.notify_waiters();
            }
            if let Some(outcome) = outcome {
                return outcome;
            }

            published.await;
        }
    }

    /// Stop consuming. The sender no longer waits on this reader.
    pub fn abandon(mut self) {
        self.detach();
    }

    /// Read and discard everything that is left, returning the byte count.
    pub async fn drain(mut self) -> Result<u64, PayloadError> {
        let mut discarded = 0u64;
        while let Some(chunk) = self.next_chunk().await? {
            discarded += chunk.len() as u64;
        }
        Ok(discarded)
    }

    fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;

        let drained = {
            let mut state = self.shared.lock();
            let behind = matches!(state.cursors[self.slot], Some(c) if c < state.published);
            state.cursors[self.slot] = None;
            if behind {
                state.pending -= 1;
                state.pending == 0
            } else {
                false
            }
        };
        if drained {
            self.shared.drained.notify_waiters();
        }
    }
}

impl Drop for PayloadReader {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn collect(mut reader: PayloadReader) -> Result<Vec<u8>, PayloadError> {
        let mut out = Vec::new();
        while let Some(chunk) = reader.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn reader_futures_can_move_between_threads() {
        let (mut tx, readers) = channel(2);
        let mut readers = readers.into_iter();
        let (mut first, second) = (readers.next().unwrap(), readers.next().unwrap());

        let pending: futures::future::BoxFuture<'static, _> = Box::pin(async move {
            let chunk = first.next_chunk().await;
            (chunk, second.drain().await)
        });
        let task = tokio::spawn(pending);

        tx.send(Bytes::from_static(b"abc")).await;
        tx.finish().await;

        let (chunk, drained) = task.await.unwrap();
        assert_eq!(chunk.unwrap().as_deref(), Some(&b"abc"[..]));
        assert_eq!(drained.unwrap(), 3);
    }

    #[tokio::test]
    async fn every_reader_sees_every_chunk() {
        let (mut tx, readers) = channel(3);
        let tasks: Vec<_> = readers.into_iter().map(|r| tokio::spawn(collect(r))).collect();

        for chunk in [&b"hello "[..], &b"shared "[..], &b"world"[..]] {
            tx.send(Bytes::copy_from_slice(chunk)).await;
        }
        tx.finish().await;

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), b"hello shared world");
        }
    }

    #[tokio::test]
    async fn slow_reader_holds_back_the_sender() {
        let (mut tx, mut readers) = channel(2);
        let mut slow = readers.pop().unwrap();
        let mut fast = readers.pop().unwrap();

        tx.send(Bytes::from_static(b"a")).await;
        assert_eq!(fast.next_chunk().await.unwrap().as_deref(), Some(&b"a"[..]));

        // `slow` has not taken "a" yet, so "b" cannot be published.
        let blocked = timeout(Duration::from_millis(50), tx.send(Bytes::from_static(b"b"))).await;
        assert!(blocked.is_err());

        assert_eq!(slow.next_chunk().await.unwrap().as_deref(), Some(&b"a"[..]));
        timeout(Duration::from_secs(1), tx.send(Bytes::from_static(b"b")))
            .await
            .expect("send should proceed once all readers caught up");
        assert_eq!(fast.next_chunk().await.unwrap().as_deref(), Some(&b"b"[..]));
        assert_eq!(slow.next_chunk().await.unwrap().as_deref(), Some(&b"b"[..]));
    }

    #[tokio::test]
    async fn abandoned_reader_releases_the_sender() {
        let (mut tx, mut readers) = channel(2);
        let full = tokio::spawn(collect(readers.pop().unwrap()));
        let mut prefix = readers.pop().unwrap();

        tx.send(Bytes::from_static(b"head")).await;
        assert_eq!(prefix.next_chunk().await.unwrap().as_deref(), Some(&b"head"[..]));
        prefix.abandon();

        for _ in 0..10 {
            timeout(Duration::from_secs(1), tx.send(Bytes::from_static(b"-tail")))
                .await
                .expect("abandoned reader must not stall the sender");
        }
        assert_eq!(tx.attached(), 1);
        tx.finish().await;

        let body = full.await.unwrap().unwrap();
        assert_eq!(body.len(), 4 + 10 * 5);
    }

    #[tokio::test]
    async fn dropped_reader_mid_chunk_unblocks() {
        let (mut tx, mut readers) = channel(2);
        let idle = readers.pop().unwrap();
        let full = tokio::spawn(collect(readers.pop().unwrap()));

        tx.send(Bytes::from_static(b"one")).await;
        drop(idle);
        timeout(Duration::from_secs(1), tx.send(Bytes::from_static(b"two")))
            .await
            .unwrap();
        tx.finish().await;

        assert_eq!(full.await.unwrap().unwrap(), b"onetwo");
    }

    #[tokio::test]
    async fn sender_without_readers_never_waits() {
        let (mut tx, readers) = channel(2);
        drop(readers);
        for _ in 0..5 {
            timeout(Duration::from_millis(100), tx.send(Bytes::from_static(b"x")))
                .await
                .unwrap();
        }
        tx.finish().await;
    }

    #[tokio::test]
    async fn failure_reaches_every_reader_after_delivered_bytes() {
        let (mut tx, readers) = channel(2);
        let tasks: Vec<_> = readers.into_iter().map(|r| tokio::spawn(collect(r))).collect();

        tx.send(Bytes::from_static(b"partial")).await;
        tx.fail(PayloadError::Truncated("part terminated early".into()))
            .await;

        for task in tasks {
            assert_eq!(
                task.await.unwrap(),
                Err(PayloadError::Truncated("part terminated early".into()))
            );
        }
    }

    #[tokio::test]
    async fn dropped_sender_is_a_fault() {
        let (tx, mut readers) = channel(1);
        drop(tx);
        let err = readers[0].next_chunk().await.unwrap_err();
        assert_eq!(err, PayloadError::SourceDropped);
    }

    #[tokio::test]
    async fn drain_counts_the_remainder() {
        let (mut tx, mut readers) = channel(1);
        let reader = readers.pop().unwrap();
        let drained = tokio::spawn(reader.drain());

        tx.send(Bytes::from_static(b"12345")).await;
        tx.send(Bytes::from_static(b"678")).await;
        tx.finish().await;

        assert_eq!(drained.await.unwrap().unwrap(), 8);
    }
}
