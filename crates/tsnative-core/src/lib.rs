//! Concurrent streaming parser for the native time-series import format.
//!
//! A native stream is a 16-byte `[min, max]` timestamp header followed by
//! length-prefixed `(metric name, block)` frame pairs. [`NativeStreamParser`]
//! reads frames on the calling thread, decodes them on a fixed set of worker
//! threads, and hands every decoded [`Block`] to a [`BlockSink`].

pub mod buffer;
pub mod codec;
pub mod core;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use buffer::{PoolMetricsSnapshot, PooledWorkItem, WorkItemPool};
pub use codec::{BlockScratch, MetricName, Tag};
pub use error::{DecodeError, FrameKind, IngestError};
pub use format::native::MAX_FRAME_SIZE;
pub use format::{FrameReader, NativeStreamWriter, ReadOutcome};
pub use pipeline::{
    BlockSink, NativeStreamParser, ParserOptions, RecordOutcome, parse_stream, process_record,
};
pub use telemetry::{
    DefaultIngestMetrics, DefaultWorkerTelemetry, IngestCounters, IngestCountersSnapshot,
    IngestMetrics, WorkerTelemetry,
};
pub use transport::ContentEncoding;
pub use types::{Block, ParseSummary, Result, TimeRange, WorkItem};
