use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use crate::telemetry::{self, tags};
use crate::types::WorkItem;

/// A free list of reusable [`WorkItem`]s.
///
/// Items are interchangeable, so the free list is a bounded MPMC channel:
/// acquiring pops a recycled item (or allocates a fresh one when the list is
/// empty) and dropping the returned [`PooledWorkItem`] resets it and pushes it
/// back. Once the list is full, surplus items are simply freed.
///
/// # Example
/// ```
/// use tsnative_core::WorkItemPool;
///
/// let pool = WorkItemPool::new(16);
/// let mut item = pool.acquire();
/// item.metric_name_buf.extend_from_slice(b"cpu");
/// drop(item); // reset and returned to the pool
/// assert!(pool.acquire().metric_name_buf.is_empty());
/// ```
#[derive(Debug)]
pub struct WorkItemPool {
    recycler: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
    max_items: usize,
    metrics: Arc<PoolMetricsInner>,
}

impl WorkItemPool {
    /// Creates a pool that retains at most `max_items` idle items.
    pub fn new(max_items: usize) -> Self {
        let max_items = max_items.max(1);
        let (tx, rx) = bounded(max_items);
        Self {
            recycler: tx,
            receiver: rx,
            max_items,
            metrics: Arc::new(PoolMetricsInner::default()),
        }
    }

    /// Checks out a reset work item.
    pub fn acquire(&self) -> PooledWorkItem {
        let item = match self.receiver.try_recv() {
            Ok(item) => {
                debug_assert!(item.is_reset(), "pool handed out a dirty work item");
                self.metrics.recycled.fetch_add(1, Ordering::Relaxed);
                telemetry::increment_counter(
                    tags::METRIC_POOL_ACQUIRE_RECYCLED_COUNT,
                    1,
                    &[("subsystem", "pool"), ("op", "acquire"), ("result", "recycled")],
                );
                item
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                self.metrics.created.fetch_add(1, Ordering::Relaxed);
                telemetry::increment_counter(
                    tags::METRIC_POOL_ACQUIRE_CREATED_COUNT,
                    1,
                    &[("subsystem", "pool"), ("op", "acquire"), ("result", "created")],
                );
                WorkItem::new()
            }
        };

        PooledWorkItem {
            item,
            recycler: self.recycler.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Returns a snapshot of the current pool metrics.
    pub fn metrics(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            created: self.metrics.created.load(Ordering::Relaxed),
            recycled: self.metrics.recycled.load(Ordering::Relaxed),
            dropped: self.metrics.dropped.load(Ordering::Relaxed),
        }
    }

    /// Number of idle items currently waiting in the free list.
    pub fn idle(&self) -> usize {
        self.receiver.len()
    }

    /// Maximum number of idle items the pool retains.
    pub fn max_items(&self) -> usize {
        self.max_items
    }
}

/// A snapshot of work item pool metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolMetricsSnapshot {
    /// Number of items allocated because the free list was empty
    pub created: usize,
    /// Number of acquisitions served from the free list
    pub recycled: usize,
    /// Number of released items freed because the free list was full
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct PoolMetricsInner {
    created: AtomicUsize,
    recycled: AtomicUsize,
    dropped: AtomicUsize,
}

/// A work item checked out of a [`WorkItemPool`].
///
/// Ownership is exclusive: the item moves from the frame reader through the
/// work queue to exactly one decode worker. Dropping it resets every buffer
/// and releases it, whatever happened to the record, so an item can never be
/// released twice or handed out dirty.
#[derive(Debug)]
pub struct PooledWorkItem {
    item: WorkItem,
    recycler: Sender<WorkItem>,
    metrics: Arc<PoolMetricsInner>,
}

impl Deref for PooledWorkItem {
    type Target = WorkItem;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

impl DerefMut for PooledWorkItem {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.item
    }
}

impl Drop for PooledWorkItem {
    fn drop(&mut self) {
        let mut item = std::mem::take(&mut self.item);
        item.reset();
        if let Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) =
            self.recycler.try_send(item)
        {
            self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
            telemetry::increment_counter(
                tags::METRIC_POOL_RELEASE_DROPPED_COUNT,
                1,
                &[("subsystem", "pool"), ("op", "release"), ("result", "dropped")],
            );
        } else {
            telemetry::increment_counter(
                tags::METRIC_POOL_RELEASE_OK_COUNT,
                1,
                &[("subsystem", "pool"), ("op", "release"), ("result", "recycled")],
            );
        }
    }
}
