pub mod options;

use std::io::Read;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::buffer::{PooledWorkItem, WorkItemPool};
use crate::codec::BlockScratch;
use crate::core::WorkerPool;
use crate::core::worker_pool::panic_message;
use crate::error::{DecodeError, IngestError};
use crate::format::native::{FrameReader, ReadOutcome};
use crate::telemetry::{
    self, DefaultIngestMetrics, DefaultWorkerTelemetry, IngestMetrics, WorkerTelemetry, tags,
};
use crate::transport::{ContentEncoding, decode_body};
use crate::types::{Block, ParseSummary, Result, TimeRange, WorkItem, duration_to_us};

pub use options::ParserOptions;

/// Receiver of decoded blocks.
///
/// `process` is called concurrently from every decode worker, in no
/// particular order. The block is only valid for the duration of the call.
pub trait BlockSink: Sync {
    fn process(&self, block: &Block) -> anyhow::Result<()>;
}

impl<F> BlockSink for F
where
    F: Fn(&Block) -> anyhow::Result<()> + Sync,
{
    fn process(&self, block: &Block) -> anyhow::Result<()> {
        self(block)
    }
}

/// What happened to a single record once it reached a decode worker.
#[derive(Debug)]
pub enum RecordOutcome {
    /// Decoded and accepted by the sink; `rows` survived the time filter.
    Delivered { rows: usize },
    DecodeFailed(DecodeError),
    CallbackFailed(anyhow::Error),
}

impl RecordOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Decodes one record held in `item` and hands the result to `sink`.
///
/// Counts surviving rows before the sink runs. A panicking sink is reported
/// as a callback failure rather than unwinding into the worker.
pub fn process_record<S: BlockSink + ?Sized>(
    item: &mut WorkItem,
    scratch: &mut BlockScratch,
    time_range: TimeRange,
    sink: &S,
    metrics: &dyn IngestMetrics,
) -> RecordOutcome {
    let rows = match item.decode(scratch, time_range) {
        Ok(rows) => rows,
        Err(err) => return RecordOutcome::DecodeFailed(err),
    };
    metrics.on_rows_decoded(rows as u64);

    match catch_unwind(AssertUnwindSafe(|| sink.process(&item.block))) {
        Ok(Ok(())) => RecordOutcome::Delivered { rows },
        Ok(Err(err)) => RecordOutcome::CallbackFailed(err),
        Err(payload) => RecordOutcome::CallbackFailed(anyhow::anyhow!(
            "block sink panicked: {}",
            panic_message(payload.as_ref())
        )),
    }
}

/// Concurrent parser for native import streams.
///
/// The calling thread reads frames while a fixed set of decode workers
/// unmarshal records and feed the sink. Work items come from a pool owned by
/// the parser, so buffers are reused across records and across calls.
///
/// # Example
/// ```
/// use tsnative_core::{
///     Block, ContentEncoding, MetricName, NativeStreamParser, NativeStreamWriter, ParserOptions,
///     TimeRange,
/// };
///
/// let mut writer = NativeStreamWriter::new(Vec::new(), TimeRange::new(0, 100)).unwrap();
/// writer
///     .write_record(&MetricName::new("cpu"), &[10, 20], &[1.0, 2.0])
///     .unwrap();
/// let body = writer.finish().unwrap();
///
/// let parser = NativeStreamParser::new(ParserOptions::default().with_workers(2));
/// let summary = parser
///     .parse(body.as_slice(), ContentEncoding::Identity, &|block: &Block| -> anyhow::Result<()> {
///         assert_eq!(block.len(), 2);
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(summary.records_read, 1);
/// ```
pub struct NativeStreamParser {
    options: ParserOptions,
    pool: Arc<WorkItemPool>,
    metrics: Arc<dyn IngestMetrics>,
    worker_telemetry: Arc<dyn WorkerTelemetry>,
}

impl NativeStreamParser {
    /// Creates a parser reporting to the process-wide telemetry registry.
    pub fn new(options: ParserOptions) -> Self {
        Self::with_metrics(options, Arc::new(DefaultIngestMetrics))
    }

    pub fn with_metrics(options: ParserOptions, metrics: Arc<dyn IngestMetrics>) -> Self {
        let pool = Arc::new(WorkItemPool::new(options.pooled_items()));
        Self {
            options,
            pool,
            metrics,
            worker_telemetry: Arc::new(DefaultWorkerTelemetry),
        }
    }

    pub fn with_worker_telemetry(mut self, telemetry: Arc<dyn WorkerTelemetry>) -> Self {
        self.worker_telemetry = telemetry;
        self
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn pool(&self) -> &WorkItemPool {
        &self.pool
    }

    /// Reads the whole stream from `body`, delivering every decodable record to `sink`.
    ///
    /// Undecodable records and sink errors are logged, counted, and skipped.
    /// Read failures and oversized frames abort the stream; records already
    /// queued at that point are still decoded before the error is returned.
    pub fn parse<R, S>(&self, body: R, encoding: ContentEncoding, sink: &S) -> Result<ParseSummary>
    where
        R: Read,
        S: BlockSink + ?Sized,
    {
        let started_at = Instant::now();
        let result = self.run(body, encoding, sink, started_at);
        let elapsed = started_at.elapsed();
        telemetry::record_histogram(
            tags::METRIC_STREAM_PARSE_LATENCY_US,
            duration_to_us(elapsed),
            &[
                ("subsystem", "native"),
                ("op", "parse"),
                ("result", if result.is_ok() { "ok" } else { "error" }),
            ],
        );

        match &result {
            Ok(summary) => tracing::debug!(
                records = summary.records_read,
                elapsed_us = duration_to_us(summary.elapsed),
                "native stream parsed"
            ),
            Err(err) => tracing::warn!(error = %err, "native stream aborted"),
        }
        result
    }

    fn run<R, S>(
        &self,
        body: R,
        encoding: ContentEncoding,
        sink: &S,
        started_at: Instant,
    ) -> Result<ParseSummary>
    where
        R: Read,
        S: BlockSink + ?Sized,
    {
        let metrics = self.metrics.as_ref();
        let mut reader = FrameReader::new(
            decode_body(body, encoding),
            self.options.read_buffer_size,
            metrics,
        );
        let time_range = reader.read_time_range()?;

        let workers = WorkerPool::with_telemetry(
            self.options.effective_workers(),
            self.options.queue_capacity(),
            Arc::clone(&self.worker_telemetry),
        );
        tracing::debug!(
            min_timestamp = time_range.min_timestamp,
            max_timestamp = time_range.max_timestamp,
            %encoding,
            workers = workers.num_workers(),
            queue_capacity = workers.queue_capacity(),
            "native stream started"
        );

        let records_read = workers.run(
            |_| BlockScratch::new(),
            |worker_id, scratch, mut item: PooledWorkItem| {
                match process_record(&mut item, scratch, time_range, sink, metrics) {
                    RecordOutcome::Delivered { .. } => Ok(()),
                    RecordOutcome::DecodeFailed(err) => {
                        metrics.on_decode_error();
                        tracing::error!(
                            worker_id,
                            metric_name_len = item.metric_name_buf.len(),
                            block_len = item.block_buf.len(),
                            error = %err,
                            "cannot unmarshal native block"
                        );
                        Err(err.into())
                    }
                    RecordOutcome::CallbackFailed(err) => {
                        metrics.on_callback_error();
                        tracing::error!(
                            worker_id,
                            metric = %item.block.metric_name,
                            rows = item.block.len(),
                            error = %err,
                            "cannot process native block"
                        );
                        Err(IngestError::Callback(err))
                    }
                }
            },
            |queue| {
                let mut records_read = 0u64;
                loop {
                    let mut item = self.pool.acquire();
                    match reader.read_record(&mut item)? {
                        ReadOutcome::EndOfStream => return Ok(records_read),
                        ReadOutcome::Record => {
                            queue.submit(item)?;
                            records_read += 1;
                        }
                    }
                }
            },
        )?;

        Ok(ParseSummary {
            time_range,
            records_read,
            elapsed: started_at.elapsed(),
        })
    }
}

/// Parses `body` with default options, reusing one process-wide parser.
pub fn parse_stream<R, S>(body: R, encoding: ContentEncoding, sink: &S) -> Result<ParseSummary>
where
    R: Read,
    S: BlockSink + ?Sized,
{
    static DEFAULT_PARSER: OnceLock<NativeStreamParser> = OnceLock::new();
    DEFAULT_PARSER
        .get_or_init(|| NativeStreamParser::new(ParserOptions::default()))
        .parse(body, encoding, sink)
}
