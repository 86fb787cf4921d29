use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::telemetry::{self, tags};

/// Counting collaborator for the native stream parser.
///
/// Injected into [`crate::NativeStreamParser`] so callers (and tests) decide
/// where the six stream counters end up. Counters only ever grow and nothing
/// in the parser reads them back.
pub trait IngestMetrics: Send + Sync {
    /// A length prefix or frame payload was read successfully.
    fn on_read_call(&self);
    /// Reading the header, a length prefix, or a payload failed.
    fn on_read_error(&self);
    /// `rows` rows survived the time-range filter.
    fn on_rows_decoded(&self, rows: u64);
    /// A complete record was read and queued.
    fn on_block_read(&self);
    /// A payload failed to decode, or a frame exceeded the size ceiling.
    fn on_decode_error(&self);
    /// The sink rejected a decoded block.
    fn on_callback_error(&self);
}

/// Forwards stream counters to the process-wide telemetry registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIngestMetrics;

const NATIVE_LABELS: &[(&str, &str)] = &[("type", "native")];

impl IngestMetrics for DefaultIngestMetrics {
    fn on_read_call(&self) {
        telemetry::increment_counter(tags::METRIC_NATIVE_READ_CALLS, 1, NATIVE_LABELS);
    }

    fn on_read_error(&self) {
        telemetry::increment_counter(tags::METRIC_NATIVE_READ_ERRORS, 1, NATIVE_LABELS);
    }

    fn on_rows_decoded(&self, rows: u64) {
        telemetry::increment_counter(tags::METRIC_NATIVE_ROWS_READ, rows, NATIVE_LABELS);
    }

    fn on_block_read(&self) {
        telemetry::increment_counter(tags::METRIC_NATIVE_BLOCKS_READ, 1, NATIVE_LABELS);
    }

    fn on_decode_error(&self) {
        telemetry::increment_counter(tags::METRIC_NATIVE_PARSE_ERRORS, 1, NATIVE_LABELS);
    }

    fn on_callback_error(&self) {
        telemetry::increment_counter(tags::METRIC_NATIVE_PROCESS_ERRORS, 1, NATIVE_LABELS);
    }
}

/// Self-contained atomic counters, readable through [`IngestCounters::snapshot`].
#[derive(Debug, Default)]
pub struct IngestCounters {
    read_calls: AtomicU64,
    read_errors: AtomicU64,
    rows_decoded: AtomicU64,
    blocks_read: AtomicU64,
    decode_errors: AtomicU64,
    callback_errors: AtomicU64,
}

/// Point-in-time copy of [`IngestCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestCountersSnapshot {
    pub read_calls: u64,
    pub read_errors: u64,
    pub rows_decoded: u64,
    pub blocks_read: u64,
    pub decode_errors: u64,
    pub callback_errors: u64,
}

impl IngestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> IngestCountersSnapshot {
        IngestCountersSnapshot {
            read_calls: self.read_calls.load(Ordering::Acquire),
            read_errors: self.read_errors.load(Ordering::Acquire),
            rows_decoded: self.rows_decoded.load(Ordering::Acquire),
            blocks_read: self.blocks_read.load(Ordering::Acquire),
            decode_errors: self.decode_errors.load(Ordering::Acquire),
            callback_errors: self.callback_errors.load(Ordering::Acquire),
        }
    }
}

impl IngestMetrics for IngestCounters {
    fn on_read_call(&self) {
        self.read_calls.fetch_add(1, Ordering::AcqRel);
    }

    fn on_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::AcqRel);
    }

    fn on_rows_decoded(&self, rows: u64) {
        self.rows_decoded.fetch_add(rows, Ordering::AcqRel);
    }

    fn on_block_read(&self) {
        self.blocks_read.fetch_add(1, Ordering::AcqRel);
    }

    fn on_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::AcqRel);
    }

    fn on_callback_error(&self) {
        self.callback_errors.fetch_add(1, Ordering::AcqRel);
    }
}
