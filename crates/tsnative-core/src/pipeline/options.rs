use serde::{Deserialize, Serialize};

use crate::format::native::{DEFAULT_QUEUE_DEPTH_PER_WORKER, DEFAULT_READ_BUFFER_SIZE};

/// Throughput knobs for [`NativeStreamParser`](super::NativeStreamParser).
///
/// The frame size ceiling is part of the wire protocol and is deliberately
/// not configurable here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Number of decode workers. Zero is treated as one.
    pub workers: usize,
    /// Queue slots per worker; the work queue holds `workers * queue_depth_per_worker` records.
    pub queue_depth_per_worker: usize,
    /// Capacity of the buffered reader wrapped around the request body.
    pub read_buffer_size: usize,
    /// Idle work items retained between records and calls.
    /// `None` sizes the pool to cover every record that can be in flight.
    pub max_pooled_items: Option<usize>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            queue_depth_per_worker: DEFAULT_QUEUE_DEPTH_PER_WORKER,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_pooled_items: None,
        }
    }
}

impl ParserOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_depth_per_worker(mut self, depth: usize) -> Self {
        self.queue_depth_per_worker = depth;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_max_pooled_items(mut self, items: usize) -> Self {
        self.max_pooled_items = Some(items);
        self
    }

    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }

    pub fn queue_capacity(&self) -> usize {
        self.effective_workers()
            .saturating_mul(self.queue_depth_per_worker.max(1))
    }

    /// Queued records, plus one per busy worker, plus the one being read.
    pub fn pooled_items(&self) -> usize {
        self.max_pooled_items.unwrap_or_else(|| {
            self.queue_capacity()
                .saturating_add(self.effective_workers())
                .saturating_add(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_available_parallelism() {
        let options = ParserOptions::default();
        assert_eq!(options.workers, num_cpus::get());
        assert_eq!(options.queue_depth_per_worker, 8);
        assert_eq!(options.read_buffer_size, 1024 * 1024);
        assert_eq!(
            options.queue_capacity(),
            options.effective_workers() * options.queue_depth_per_worker
        );
    }

    #[test]
    fn derived_pool_size_covers_in_flight_items() {
        let options = ParserOptions::default()
            .with_workers(4)
            .with_queue_depth_per_worker(2);
        assert_eq!(options.queue_capacity(), 8);
        assert_eq!(options.pooled_items(), 4 * (2 + 1) + 1);
        assert_eq!(options.with_max_pooled_items(3).pooled_items(), 3);
    }

    #[test]
    fn zero_workers_still_make_progress() {
        let options = ParserOptions::default()
            .with_workers(0)
            .with_queue_depth_per_worker(0);
        assert_eq!(options.effective_workers(), 1);
        assert_eq!(options.queue_capacity(), 1);
    }
}
