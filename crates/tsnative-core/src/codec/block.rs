//! Portable block encoding for the second frame of every record.
//!
//! ```text
//! block := row_count:u32
//!          [row_count > 0]:
//!            first_timestamp:i64
//!            first_value_bits:u64
//!            (row_count - 1) x zigzag varint   timestamp delta-of-delta
//!            (row_count - 1) x varint          (bits ^ prev_bits).swap_bytes()
//! ```
//!
//! Timestamps follow the delta-of-delta scheme used by Gorilla-style stores;
//! values are XORed against their predecessor and byte-swapped so that the
//! usually-zero low mantissa bytes land in the high positions and the varint
//! stays short.

use bytes::{Buf, BufMut};

use crate::codec::varint::{decode_varint, decode_varint_u64, encode_varint, encode_varint_u64};
use crate::error::DecodeError;
use crate::types::TimeRange;

const ROW_COUNT_SIZE: usize = 4;
const FIRST_ROW_SIZE: usize = 16;
/// Every row after the first needs at least one byte per column.
const MIN_TRAILING_ROW_SIZE: usize = 2;

/// Worker-local decode target. Rows land here unfiltered before being copied
/// into the outgoing block.
#[derive(Debug, Default)]
pub struct BlockScratch {
    timestamps: Vec<i64>,
    values: Vec<f64>,
}

impl BlockScratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn reset(&mut self) {
        self.timestamps.clear();
        self.values.clear();
    }

    /// Appends the rows whose timestamp lies inside `range` and returns how many were kept.
    pub fn append_rows_in_range(
        &self,
        range: TimeRange,
        timestamps: &mut Vec<i64>,
        values: &mut Vec<f64>,
    ) -> usize {
        let before = timestamps.len();
        for (&ts, &value) in self.timestamps.iter().zip(&self.values) {
            if range.contains(ts) {
                timestamps.push(ts);
                values.push(value);
            }
        }
        timestamps.len() - before
    }
}

/// Decodes one block from the front of `src` into `scratch`, returning the unconsumed tail.
pub fn unmarshal_block<'a>(
    scratch: &mut BlockScratch,
    src: &'a [u8],
) -> Result<&'a [u8], DecodeError> {
    scratch.reset();
    let payload_len = src.len();
    let fail = |reason| DecodeError::Block {
        payload_len,
        reason,
    };

    let mut cursor = src;
    if cursor.remaining() < ROW_COUNT_SIZE {
        return Err(fail("truncated row count"));
    }
    let row_count = cursor.get_u32() as usize;
    if row_count == 0 {
        return Ok(cursor);
    }
    if cursor.remaining() < FIRST_ROW_SIZE {
        return Err(fail("truncated first row"));
    }
    if (row_count - 1) > (cursor.remaining() - FIRST_ROW_SIZE) / MIN_TRAILING_ROW_SIZE {
        return Err(fail("row count exceeds payload size"));
    }

    scratch.timestamps.reserve(row_count);
    scratch.values.reserve(row_count);

    let mut prev_ts = cursor.get_i64();
    let mut prev_bits = cursor.get_u64();
    scratch.timestamps.push(prev_ts);
    scratch.values.push(f64::from_bits(prev_bits));

    let mut prev_delta = 0i64;
    for _ in 1..row_count {
        let delta_of_delta = decode_varint(&mut cursor).map_err(fail)?;
        prev_delta = prev_delta.wrapping_add(delta_of_delta);
        prev_ts = prev_ts.wrapping_add(prev_delta);
        scratch.timestamps.push(prev_ts);
    }
    for _ in 1..row_count {
        let xor = decode_varint_u64(&mut cursor).map_err(fail)?.swap_bytes();
        prev_bits ^= xor;
        scratch.values.push(f64::from_bits(prev_bits));
    }

    Ok(cursor)
}

/// Appends the encoding of the given rows to `dst`.
pub fn marshal_block(
    dst: &mut impl BufMut,
    timestamps: &[i64],
    values: &[f64],
) -> Result<(), &'static str> {
    if timestamps.len() != values.len() {
        return Err("timestamps and values differ in length");
    }
    let row_count = u32::try_from(timestamps.len()).map_err(|_| "too many rows for one block")?;
    dst.put_u32(row_count);
    let (Some(&first_ts), Some(&first_value)) = (timestamps.first(), values.first()) else {
        return Ok(());
    };
    dst.put_i64(first_ts);
    dst.put_u64(first_value.to_bits());

    let mut prev_delta = 0i64;
    for pair in timestamps.windows(2) {
        let delta = pair[1].wrapping_sub(pair[0]);
        encode_varint(dst, delta.wrapping_sub(prev_delta));
        prev_delta = delta;
    }
    for pair in values.windows(2) {
        let xor = pair[1].to_bits() ^ pair[0].to_bits();
        encode_varint_u64(dst, xor.swap_bytes());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(timestamps: &[i64], values: &[f64]) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::new();
        marshal_block(&mut buf, timestamps, values).expect("marshal block");
        buf
    }

    #[test]
    fn decodes_irregular_series() {
        let timestamps = [1_000, 1_015, 1_030, 1_031, 900, i64::MAX];
        let values = [1.0, 1.5, -2.25, 0.0, f64::MAX, 42.0];
        let buf = encode(&timestamps, &values);

        let mut scratch = BlockScratch::new();
        let tail = unmarshal_block(&mut scratch, &buf).expect("unmarshal");
        assert!(tail.is_empty());
        assert_eq!(scratch.timestamps(), &timestamps);
        assert_eq!(scratch.values(), &values);
    }

    #[test]
    fn preserves_nan_bit_patterns() {
        let odd_nan = f64::from_bits(0x7FF8_0000_0000_0123);
        let buf = encode(&[1, 2], &[odd_nan, f64::NAN]);

        let mut scratch = BlockScratch::new();
        unmarshal_block(&mut scratch, &buf).expect("unmarshal");
        assert_eq!(scratch.values()[0].to_bits(), odd_nan.to_bits());
        assert_eq!(scratch.values()[1].to_bits(), f64::NAN.to_bits());
    }

    #[test]
    fn regular_series_compresses() {
        let timestamps: Vec<i64> = (0..1_000).map(|i| 1_700_000_000_000 + i * 15_000).collect();
        let values = vec![3.0; 1_000];
        let buf = encode(&timestamps, &values);
        assert!(buf.len() < ROW_COUNT_SIZE + FIRST_ROW_SIZE + 2 * 1_000 + 8);
    }

    #[test]
    fn empty_block_has_no_rows() {
        let buf = encode(&[], &[]);
        assert_eq!(buf, vec![0, 0, 0, 0]);

        let mut scratch = BlockScratch::new();
        let tail = unmarshal_block(&mut scratch, &buf).expect("unmarshal");
        assert!(tail.is_empty());
        assert!(scratch.is_empty());
    }

    #[test]
    fn trailing_bytes_are_returned_as_tail() {
        let mut buf = encode(&[5], &[1.0]);
        buf.extend_from_slice(b"xyz");

        let mut scratch = BlockScratch::new();
        let tail = unmarshal_block(&mut scratch, &buf).expect("unmarshal");
        assert_eq!(tail, b"xyz");
        assert_eq!(scratch.len(), 1);
    }

    #[test]
    fn truncated_payloads_are_rejected() {
        let buf = encode(&[1, 2, 3], &[1.0, 2.0, 3.0]);
        let mut scratch = BlockScratch::new();
        for cut in 0..buf.len() {
            assert!(
                unmarshal_block(&mut scratch, &buf[..cut]).is_err(),
                "prefix of {cut} bytes decoded"
            );
        }
    }

    #[test]
    fn absurd_row_count_is_rejected_before_allocation() {
        let mut buf: Vec<u8> = Vec::new();
        buf.put_u32(u32::MAX);
        buf.put_i64(0);
        buf.put_u64(0);

        let mut scratch = BlockScratch::new();
        let err = unmarshal_block(&mut scratch, &buf).expect_err("row count");
        assert_eq!(
            err,
            DecodeError::Block {
                payload_len: 20,
                reason: "row count exceeds payload size"
            }
        );
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        assert!(marshal_block(&mut Vec::new(), &[1, 2], &[1.0]).is_err());
    }

    #[test]
    fn range_filter_is_inclusive_and_keeps_order() {
        let buf = encode(&[900, 1_000, 1_500, 2_000, 2_500], &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut scratch = BlockScratch::new();
        unmarshal_block(&mut scratch, &buf).expect("unmarshal");

        let mut timestamps = Vec::new();
        let mut values = Vec::new();
        let kept =
            scratch.append_rows_in_range(TimeRange::new(1_000, 2_000), &mut timestamps, &mut values);
        assert_eq!(kept, 3);
        assert_eq!(timestamps, vec![1_000, 1_500, 2_000]);
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
    }
}
