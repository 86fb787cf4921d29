use std::io::Write;

use crate::codec::block::marshal_block;
use crate::codec::metric_name::MetricName;
use crate::error::{FrameKind, IngestError};
use crate::types::{Result, TimeRange};

use super::MAX_FRAME_SIZE;

/// Produces native import streams: the time range header, then one frame pair per record.
#[derive(Debug)]
pub struct NativeStreamWriter<W: Write> {
    writer: W,
    scratch: Vec<u8>,
    records_written: u64,
}

impl<W: Write> NativeStreamWriter<W> {
    /// Wraps `writer` and immediately writes the stream header.
    pub fn new(mut writer: W, time_range: TimeRange) -> Result<Self> {
        time_range.write(&mut writer)?;
        Ok(Self {
            writer,
            scratch: Vec::new(),
            records_written: 0,
        })
    }

    /// Encodes and writes one record.
    pub fn write_record(
        &mut self,
        metric_name: &MetricName,
        timestamps: &[i64],
        values: &[f64],
    ) -> Result<()> {
        self.scratch.clear();
        metric_name
            .marshal(&mut self.scratch)
            .map_err(IngestError::InvalidFormat)?;
        let split = self.scratch.len();
        marshal_block(&mut self.scratch, timestamps, values).map_err(IngestError::InvalidFormat)?;

        let (name, block) = self.scratch.split_at(split);
        write_record_frames(&mut self.writer, name, block)?;
        self.records_written += 1;
        Ok(())
    }

    /// Writes a record whose payloads are already encoded.
    pub fn write_raw_record(&mut self, metric_name: &[u8], block: &[u8]) -> Result<()> {
        write_record_frames(&mut self.writer, metric_name, block)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn write_record_frames<W: Write>(writer: &mut W, metric_name: &[u8], block: &[u8]) -> Result<()> {
    let name_len = frame_len(FrameKind::MetricName, metric_name)?;
    let block_len = frame_len(FrameKind::Block, block)?;
    writer.write_all(&name_len.to_be_bytes())?;
    writer.write_all(metric_name)?;
    writer.write_all(&block_len.to_be_bytes())?;
    writer.write_all(block)?;
    Ok(())
}

fn frame_len(frame: FrameKind, payload: &[u8]) -> Result<u32> {
    match u32::try_from(payload.len()) {
        Ok(len) if len <= MAX_FRAME_SIZE => Ok(len),
        _ => Err(IngestError::FrameTooLarge {
            frame,
            size: payload.len() as u64,
            limit: MAX_FRAME_SIZE,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::native::{FRAME_LENGTH_SIZE, TIME_RANGE_HEADER_SIZE};

    #[test]
    fn writes_header_then_frame_pairs() -> Result<()> {
        let mut writer = NativeStreamWriter::new(Vec::new(), TimeRange::new(0, 10))?;
        writer.write_raw_record(b"ab", b"cde")?;
        assert_eq!(writer.records_written(), 1);
        let bytes = writer.finish()?;

        assert_eq!(
            bytes.len(),
            TIME_RANGE_HEADER_SIZE + 2 * FRAME_LENGTH_SIZE + 5
        );
        assert_eq!(&bytes[16..20], &[0, 0, 0, 2]);
        assert_eq!(&bytes[20..22], b"ab");
        assert_eq!(&bytes[22..26], &[0, 0, 0, 3]);
        assert_eq!(&bytes[26..], b"cde");
        Ok(())
    }

    #[test]
    fn oversized_payload_writes_nothing() -> Result<()> {
        let mut writer = NativeStreamWriter::new(Vec::new(), TimeRange::new(0, 10))?;
        let block = vec![0u8; MAX_FRAME_SIZE as usize + 1];
        let err = writer
            .write_raw_record(b"name", &block)
            .expect_err("oversized block");
        assert!(matches!(
            err,
            IngestError::FrameTooLarge {
                frame: FrameKind::Block,
                ..
            }
        ));
        assert_eq!(writer.records_written(), 0);
        assert_eq!(writer.finish()?.len(), TIME_RANGE_HEADER_SIZE);
        Ok(())
    }

    #[test]
    fn mismatched_rows_are_rejected() -> Result<()> {
        let mut writer = NativeStreamWriter::new(Vec::new(), TimeRange::new(0, 10))?;
        let err = writer
            .write_record(&MetricName::new("cpu"), &[1, 2], &[1.0])
            .expect_err("mismatched columns");
        assert!(matches!(err, IngestError::InvalidFormat(_)));
        Ok(())
    }
}
