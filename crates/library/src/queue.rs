//! Deduplicating FIFO of documents waiting to be processed.
//!
//! Change notifications arrive far more often than documents need
//! processing: an editor saving on every keystroke produces a burst of
//! events for the same file. [`ChangeQueue`] collapses them, and [`run`]
//! drains whatever accumulated once per tick.
//!
//! A document is removed from the queue when its batch starts, not when it
//! finishes. An edit that lands while the document is still being processed
//! queues it again, so the next tick may process it a second time, possibly
//! overlapping the first pass. Processing is idempotent, so the second pass
//! either rewrites the new links or leaves the file alone.

use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[derive(Debug)]
pub struct ChangeQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Default for ChangeQueue<T> {
    fn default() -> Self {
        Self { items: Mutex::new(VecDeque::new()) }
    }
}

impl<T: PartialEq> ChangeQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless an equal item is already waiting.
    ///
    /// Returns `false` if it was a duplicate.
    pub fn push(&self, item: T) -> bool {
        let mut items = self.lock();
        if items.contains(&item) {
            return false;
        }
        items.push_back(item);
        true
    }

    /// Remove and return the oldest item.
    pub fn pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Take everything currently queued, oldest first.
    ///
    /// Items pushed after this returns belong to the next drain.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.lock().contains(item)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drain `queue` every `period` and hand each batch to `handler`, items of
/// one batch running concurrently.
///
/// A batch always runs to completion. Returns once `shutdown` reads `true`
/// or its sender is dropped; the check happens between batches.
pub async fn run<T, F, Fut>(queue: &ChangeQueue<T>, period: Duration, mut shutdown: watch::Receiver<bool>, handler: F)
where
    T: PartialEq,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let batch = queue.drain();
                if batch.is_empty() {
                    continue;
                }
                tracing::debug!(count = batch.len(), "Draining change queue");
                join_all(batch.into_iter().map(&handler)).await;
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::debug!(pending = queue.len(), "Change queue stopped");
                    return;
                }
            },
        }
    }
}
