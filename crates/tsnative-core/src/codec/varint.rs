//! Variable-length integers used inside native block payloads.
//!
//! Unsigned values use 7 data bits per byte with the high bit as a
//! continuation flag. Signed values are ZigZag-mapped first so small
//! negative deltas stay short.

use bytes::{Buf, BufMut};

/// Longest valid encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Encodes a signed integer as a ZigZag varint.
pub fn encode_varint(buf: &mut impl BufMut, value: i64) {
    encode_varint_u64(buf, zigzag_encode(value));
}

/// Encodes an unsigned integer as a varint.
pub fn encode_varint_u64(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decodes a ZigZag varint.
pub fn decode_varint(buf: &mut impl Buf) -> Result<i64, &'static str> {
    decode_varint_u64(buf).map(zigzag_decode)
}

/// Decodes an unsigned varint, rejecting truncated and overlong encodings.
pub fn decode_varint_u64(buf: &mut impl Buf) -> Result<u64, &'static str> {
    let mut value = 0u64;
    for index in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err("truncated varint");
        }
        let byte = buf.get_u8();
        let bits = u64::from(byte & 0x7F);
        if index == MAX_VARINT_LEN - 1 && bits > 1 {
            return Err("varint overflows u64");
        }
        value |= bits << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err("varint too long")
}

#[inline]
fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_values_survive_zigzag() {
        for value in [0i64, 1, -1, 63, -64, 1_000_000, -1_000_000, i64::MIN, i64::MAX] {
            let mut buf: Vec<u8> = Vec::new();
            encode_varint(&mut buf, value);
            let mut cursor = buf.as_slice();
            assert_eq!(decode_varint(&mut cursor), Ok(value));
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn small_values_use_one_byte() {
        let mut buf: Vec<u8> = Vec::new();
        encode_varint(&mut buf, -1);
        assert_eq!(buf, vec![1]);

        buf.clear();
        encode_varint_u64(&mut buf, 127);
        assert_eq!(buf, vec![0x7F]);
    }

    #[test]
    fn u64_max_takes_ten_bytes() {
        let mut buf: Vec<u8> = Vec::new();
        encode_varint_u64(&mut buf, u64::MAX);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        let mut cursor = buf.as_slice();
        assert_eq!(decode_varint_u64(&mut cursor), Ok(u64::MAX));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let mut cursor: &[u8] = &[0x80, 0x80];
        assert_eq!(decode_varint_u64(&mut cursor), Err("truncated varint"));

        let mut empty: &[u8] = &[];
        assert!(decode_varint(&mut empty).is_err());
    }

    #[test]
    fn overlong_input_is_rejected() {
        let mut cursor: &[u8] = &[0xFF; 11];
        assert!(decode_varint_u64(&mut cursor).is_err());

        let mut overflow: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert_eq!(
            decode_varint_u64(&mut overflow),
            Err("varint overflows u64")
        );
    }
}
