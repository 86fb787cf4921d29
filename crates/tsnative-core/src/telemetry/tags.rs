pub const METRIC_NATIVE_READ_CALLS: &str = "tsnative.native.read_calls.count";
pub const METRIC_NATIVE_READ_ERRORS: &str = "tsnative.native.read_errors.count";
pub const METRIC_NATIVE_ROWS_READ: &str = "tsnative.native.rows_read.count";
pub const METRIC_NATIVE_BLOCKS_READ: &str = "tsnative.native.blocks_read.count";
pub const METRIC_NATIVE_PARSE_ERRORS: &str = "tsnative.native.parse_errors.count";
pub const METRIC_NATIVE_PROCESS_ERRORS: &str = "tsnative.native.process_errors.count";

pub const METRIC_POOL_ACQUIRE_CREATED_COUNT: &str = "tsnative.pool.acquire.created.count";
pub const METRIC_POOL_ACQUIRE_RECYCLED_COUNT: &str = "tsnative.pool.acquire.recycled.count";
pub const METRIC_POOL_RELEASE_OK_COUNT: &str = "tsnative.pool.release.ok.count";
pub const METRIC_POOL_RELEASE_DROPPED_COUNT: &str = "tsnative.pool.release.dropped.count";

pub const METRIC_WORKER_QUEUE_DEPTH: &str = "tsnative.worker.queue.depth";
pub const METRIC_WORKER_QUEUE_DEPTH_HIST: &str = "tsnative.worker.queue.depth_hist";
pub const METRIC_WORKER_TASK_START_COUNT: &str = "tsnative.worker.task.start.count";
pub const METRIC_WORKER_TASK_FINISH_COUNT: &str = "tsnative.worker.task.finish.count";
pub const METRIC_WORKER_TASK_FAIL_COUNT: &str = "tsnative.worker.task.fail.count";
pub const METRIC_WORKER_TASK_LATENCY_US: &str = "tsnative.worker.task.latency_us";
pub const METRIC_WORKER_ACTIVE_COUNT: &str = "tsnative.worker.active.count";

pub const METRIC_STREAM_PARSE_LATENCY_US: &str = "tsnative.stream.parse.latency_us";
