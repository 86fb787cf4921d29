//! Reusable decode buffers.

pub mod pool;

pub use pool::{PoolMetricsSnapshot, PooledWorkItem, WorkItemPool};
