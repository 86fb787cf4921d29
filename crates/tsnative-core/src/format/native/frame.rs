use std::io::{self, BufReader, Read};

use crate::error::{FrameKind, IngestError};
use crate::telemetry::IngestMetrics;
use crate::types::{Result, TimeRange, WorkItem};

use super::{FRAME_LENGTH_SIZE, MAX_FRAME_SIZE};

/// Result of asking the reader for the next record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Both frames of a record were read into the work item.
    Record,
    /// The stream ended cleanly on a record boundary.
    EndOfStream,
}

/// Sequential reader for the native stream: header first, then frame pairs.
///
/// Every successful length or payload read counts as one read call; every
/// failed one counts as a read error before the fatal error is returned.
pub struct FrameReader<'m, R: Read> {
    reader: BufReader<R>,
    metrics: &'m dyn IngestMetrics,
    size_buf: [u8; FRAME_LENGTH_SIZE],
}

impl<'m, R: Read> FrameReader<'m, R> {
    pub fn new(reader: R, read_buffer_size: usize, metrics: &'m dyn IngestMetrics) -> Self {
        Self {
            reader: BufReader::with_capacity(read_buffer_size.max(FRAME_LENGTH_SIZE), reader),
            metrics,
            size_buf: [0u8; FRAME_LENGTH_SIZE],
        }
    }

    pub fn read_time_range(&mut self) -> Result<TimeRange> {
        TimeRange::read(&mut self.reader).inspect_err(|_| self.metrics.on_read_error())
    }

    /// Fills `item` with the next record's raw metric name and block bytes.
    ///
    /// A clean end of input is only accepted before the first byte of a
    /// record's metric-name length; anywhere else it is a truncated stream.
    pub fn read_record(&mut self, item: &mut WorkItem) -> Result<ReadOutcome> {
        let Some(size) = self.try_read_frame_size(FrameKind::MetricName)? else {
            return Ok(ReadOutcome::EndOfStream);
        };
        self.read_payload(FrameKind::MetricName, size, &mut item.metric_name_buf)?;

        let size = self.read_frame_size(FrameKind::Block)?;
        self.read_payload(FrameKind::Block, size, &mut item.block_buf)?;

        self.metrics.on_block_read();
        Ok(ReadOutcome::Record)
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn read_frame_size(&mut self, frame: FrameKind) -> Result<u32> {
        match self.try_read_frame_size(frame)? {
            Some(size) => Ok(size),
            None => Err(self.truncated_size(frame, 0)),
        }
    }

    /// Returns `None` only when the input ends before the first length byte.
    fn try_read_frame_size(&mut self, frame: FrameKind) -> Result<Option<u32>> {
        let filled = read_full(&mut self.reader, &mut self.size_buf).map_err(|source| {
            self.metrics.on_read_error();
            IngestError::stream_read(format!("{frame} size"), source)
        })?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < FRAME_LENGTH_SIZE {
            return Err(self.truncated_size(frame, filled));
        }
        self.metrics.on_read_call();

        let size = u32::from_be_bytes(self.size_buf);
        if size > MAX_FRAME_SIZE {
            self.metrics.on_decode_error();
            return Err(IngestError::FrameTooLarge {
                frame,
                size: u64::from(size),
                limit: MAX_FRAME_SIZE,
            });
        }
        Ok(Some(size))
    }

    fn truncated_size(&self, frame: FrameKind, filled: usize) -> IngestError {
        self.metrics.on_read_error();
        IngestError::stream_read(
            format!("{frame} size"),
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("got {filled} of {FRAME_LENGTH_SIZE} length bytes"),
            ),
        )
    }

    fn read_payload(&mut self, frame: FrameKind, size: u32, buf: &mut Vec<u8>) -> Result<()> {
        buf.resize(size as usize, 0);
        if let Err(source) = self.reader.read_exact(buf) {
            self.metrics.on_read_error();
            return Err(IngestError::stream_read(
                format!("{frame} with size {size} bytes"),
                source,
            ));
        }
        self.metrics.on_read_call();
        Ok(())
    }
}

/// Like `read_exact`, but reports how many bytes arrived before end of input
/// instead of failing, so callers can tell a clean boundary from a cut.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
