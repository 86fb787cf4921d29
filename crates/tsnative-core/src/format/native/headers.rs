use std::io::{Read, Write};

use crate::error::IngestError;
use crate::types::{Result, TimeRange};

use super::TIME_RANGE_HEADER_SIZE;

impl TimeRange {
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Reads the stream header. Running out of input, even before the first
    /// byte, is a read error: a stream without a header carries no data.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; TIME_RANGE_HEADER_SIZE];
        reader
            .read_exact(&mut bytes)
            .map_err(|source| IngestError::stream_read("time range", source))?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; TIME_RANGE_HEADER_SIZE] {
        let mut bytes = [0u8; TIME_RANGE_HEADER_SIZE];
        bytes[..8].copy_from_slice(&self.min_timestamp.to_be_bytes());
        bytes[8..].copy_from_slice(&self.max_timestamp.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: [u8; TIME_RANGE_HEADER_SIZE]) -> Self {
        let mut min = [0u8; 8];
        let mut max = [0u8; 8];
        min.copy_from_slice(&bytes[..8]);
        max.copy_from_slice(&bytes[8..]);
        Self::new(i64::from_be_bytes(min), i64::from_be_bytes(max))
    }
}
