use std::time::Duration;

use crate::telemetry::{self, tags};
use crate::types::duration_to_us;

/// Telemetry contract for decode worker runtimes.
///
/// Workers call these hooks around every dequeued item so backends can track
/// queue pressure and task latency without the worker loop knowing about them.
pub trait WorkerTelemetry: Send + Sync {
    fn on_queue_depth(&self, worker_id: usize, depth: usize);
    fn on_task_started(&self, worker_id: usize);
    fn on_task_finished(&self, worker_id: usize, elapsed: Duration);
    fn on_task_failed(&self, worker_id: usize, elapsed: Duration);
}

/// Default telemetry implementation that reports worker metrics to the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWorkerTelemetry;

impl WorkerTelemetry for DefaultWorkerTelemetry {
    fn on_queue_depth(&self, _worker_id: usize, depth: usize) {
        telemetry::set_gauge(
            tags::METRIC_WORKER_QUEUE_DEPTH,
            depth as u64,
            &[("subsystem", "worker"), ("op", "queue_depth")],
        );
        telemetry::record_histogram(
            tags::METRIC_WORKER_QUEUE_DEPTH_HIST,
            depth as u64,
            &[("subsystem", "worker"), ("op", "queue_depth")],
        );
    }

    fn on_task_started(&self, _worker_id: usize) {
        telemetry::increment_counter(
            tags::METRIC_WORKER_TASK_START_COUNT,
            1,
            &[("subsystem", "worker"), ("op", "task_start")],
        );
        telemetry::add_gauge(
            tags::METRIC_WORKER_ACTIVE_COUNT,
            1,
            &[("subsystem", "worker"), ("op", "task_start")],
        );
    }

    fn on_task_finished(&self, _worker_id: usize, elapsed: Duration) {
        telemetry::increment_counter(
            tags::METRIC_WORKER_TASK_FINISH_COUNT,
            1,
            &[("subsystem", "worker"), ("op", "task_finish"), ("result", "ok")],
        );
        telemetry::record_histogram(
            tags::METRIC_WORKER_TASK_LATENCY_US,
            duration_to_us(elapsed),
            &[("subsystem", "worker"), ("op", "task"), ("result", "ok")],
        );
        telemetry::sub_gauge_saturating(
            tags::METRIC_WORKER_ACTIVE_COUNT,
            1,
            &[("subsystem", "worker"), ("op", "task_finish")],
        );
    }

    fn on_task_failed(&self, _worker_id: usize, elapsed: Duration) {
        telemetry::increment_counter(
            tags::METRIC_WORKER_TASK_FAIL_COUNT,
            1,
            &[("subsystem", "worker"), ("op", "task_finish"), ("result", "error")],
        );
        telemetry::record_histogram(
            tags::METRIC_WORKER_TASK_LATENCY_US,
            duration_to_us(elapsed),
            &[("subsystem", "worker"), ("op", "task"), ("result", "error")],
        );
        telemetry::sub_gauge_saturating(
            tags::METRIC_WORKER_ACTIVE_COUNT,
            1,
            &[("subsystem", "worker"), ("op", "task_failed")],
        );
    }
}
