use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::block::{BlockScratch, unmarshal_block};
use crate::codec::metric_name::MetricName;
use crate::error::{DecodeError, IngestError};

pub type Result<T> = std::result::Result<T, IngestError>;

/// Inclusive `[min_timestamp, max_timestamp]` window applied to every decoded row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub min_timestamp: i64,
    pub max_timestamp: i64,
}

impl TimeRange {
    pub const fn new(min_timestamp: i64, max_timestamp: i64) -> Self {
        Self {
            min_timestamp,
            max_timestamp,
        }
    }

    /// A range that admits every timestamp.
    pub const fn unbounded() -> Self {
        Self::new(i64::MIN, i64::MAX)
    }

    #[inline]
    pub fn contains(&self, timestamp: i64) -> bool {
        self.min_timestamp <= timestamp && timestamp <= self.max_timestamp
    }
}

/// A decoded record: metric identity plus its rows, already filtered to the stream's range.
///
/// Blocks handed to a sink are borrowed from a pooled work item and their
/// backing storage is reused for the next record, so a sink must copy what it
/// wants to keep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub metric_name: MetricName,
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Iterates `(timestamp, value)` pairs in decode order.
    pub fn rows(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    pub fn reset(&mut self) {
        self.metric_name.reset();
        self.timestamps.clear();
        self.values.clear();
    }
}

/// Pooled unit of work carrying one record from the frame reader to a decode worker.
#[derive(Debug, Default)]
pub struct WorkItem {
    pub metric_name_buf: Vec<u8>,
    pub block_buf: Vec<u8>,
    pub block: Block,
}

impl WorkItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncates every buffer to zero length; allocated capacity is kept.
    pub fn reset(&mut self) {
        self.metric_name_buf.clear();
        self.block_buf.clear();
        self.block.reset();
    }

    pub fn is_reset(&self) -> bool {
        self.metric_name_buf.is_empty()
            && self.block_buf.is_empty()
            && self.block.is_empty()
            && self.block.metric_name.metric_group.is_empty()
            && self.block.metric_name.tags.is_empty()
    }

    /// Decodes both raw frames into `self.block`, keeping rows inside `range`.
    ///
    /// Returns the number of rows that survived the filter.
    pub fn decode(
        &mut self,
        scratch: &mut BlockScratch,
        range: TimeRange,
    ) -> std::result::Result<usize, DecodeError> {
        let block = &mut self.block;
        block.metric_name.unmarshal(&self.metric_name_buf)?;

        let tail = unmarshal_block(scratch, &self.block_buf)?;
        if !tail.is_empty() {
            return Err(DecodeError::TrailingBytes {
                payload_len: self.block_buf.len(),
                tail_len: tail.len(),
            });
        }

        block.timestamps.clear();
        block.values.clear();
        Ok(scratch.append_rows_in_range(range, &mut block.timestamps, &mut block.values))
    }
}

/// Summary of one completed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseSummary {
    pub time_range: TimeRange,
    /// Records fully read and handed to the decode workers.
    pub records_read: u64,
    pub elapsed: Duration,
}

#[inline]
pub(crate) fn duration_to_us(duration: Duration) -> u64 {
    duration.as_micros().min(u64::MAX as u128) as u64
}
