pub mod worker_pool;

pub use worker_pool::{WorkQueue, WorkerPool};
