//! Metric identity carried in the first frame of every record.
//!
//! Layout (big-endian lengths):
//!
//! ```text
//! metric_name := group_len:u16 group[group_len] tag*
//! tag         := key_len:u16 key[key_len] value_len:u16 value[value_len]
//! ```

use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::DecodeError;

/// A single `key=value` label attached to a metric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Tag {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Parsed metric identity: the metric group (its `__name__`) plus labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricName {
    pub metric_group: Vec<u8>,
    pub tags: Vec<Tag>,
}

impl MetricName {
    pub fn new(metric_group: impl Into<Vec<u8>>) -> Self {
        Self {
            metric_group: metric_group.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    /// Clears the name while keeping the group buffer's capacity.
    pub fn reset(&mut self) {
        self.metric_group.clear();
        self.tags.clear();
    }

    /// Returns the value of the tag named `key`, if present.
    pub fn tag_value(&self, key: &[u8]) -> Option<&[u8]> {
        self.tags
            .iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.value.as_slice())
    }

    /// Appends the wire encoding of this name to `dst`.
    ///
    /// Fails when the group or a tag part does not fit a `u16` length, or a
    /// tag key is empty.
    pub fn marshal(&self, dst: &mut impl BufMut) -> Result<(), &'static str> {
        put_part(dst, &self.metric_group)?;
        for tag in &self.tags {
            if tag.key.is_empty() {
                return Err("empty tag key");
            }
            put_part(dst, &tag.key)?;
            put_part(dst, &tag.value)?;
        }
        Ok(())
    }

    /// Replaces `self` with the name decoded from `src`. The whole payload is consumed.
    pub fn unmarshal(&mut self, src: &[u8]) -> Result<(), DecodeError> {
        self.reset();
        let payload_len = src.len();
        let fail = |reason| DecodeError::MetricName {
            payload_len,
            reason,
        };

        let mut cursor = src;
        let group = take_part(&mut cursor).map_err(fail)?;
        self.metric_group.extend_from_slice(group);

        while cursor.has_remaining() {
            let key = take_part(&mut cursor).map_err(fail)?;
            if key.is_empty() {
                return Err(fail("empty tag key"));
            }
            let value = take_part(&mut cursor).map_err(fail)?;
            self.tags.push(Tag::new(key, value));
        }
        Ok(())
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.metric_group))?;
        f.write_str("{")?;
        for (idx, tag) in self.tags.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(
                f,
                "{}={:?}",
                String::from_utf8_lossy(&tag.key),
                String::from_utf8_lossy(&tag.value)
            )?;
        }
        f.write_str("}")
    }
}

fn put_part(dst: &mut impl BufMut, part: &[u8]) -> Result<(), &'static str> {
    let len = u16::try_from(part.len()).map_err(|_| "metric name part exceeds u16 length")?;
    dst.put_u16(len);
    dst.put_slice(part);
    Ok(())
}

fn take_part<'a>(cursor: &mut &'a [u8]) -> Result<&'a [u8], &'static str> {
    if cursor.remaining() < 2 {
        return Err("truncated length prefix");
    }
    let len = cursor.get_u16() as usize;
    let slice: &'a [u8] = *cursor;
    if slice.len() < len {
        return Err("length prefix exceeds payload");
    }
    let (part, rest) = slice.split_at(len);
    *cursor = rest;
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(name: &MetricName) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::new();
        name.marshal(&mut buf).expect("marshal metric name");
        buf
    }

    #[test]
    fn decodes_group_and_tags() {
        let name = MetricName::new("cpu")
            .with_tag("host", "a")
            .with_tag("dc", "");
        let mut decoded = MetricName::default();
        decoded.unmarshal(&encode(&name)).expect("unmarshal");
        assert_eq!(decoded, name);
        assert_eq!(decoded.tag_value(b"host"), Some(&b"a"[..]));
        assert_eq!(decoded.tag_value(b"dc"), Some(&b""[..]));
        assert_eq!(decoded.tag_value(b"missing"), None);
    }

    #[test]
    fn unmarshal_replaces_previous_contents() {
        let mut decoded = MetricName::new("old").with_tag("k", "v");
        decoded
            .unmarshal(&encode(&MetricName::new("new")))
            .expect("unmarshal");
        assert_eq!(decoded, MetricName::new("new"));
    }

    #[test]
    fn rejects_empty_payload() {
        let mut decoded = MetricName::default();
        let err = decoded.unmarshal(&[]).expect_err("empty payload");
        assert_eq!(
            err,
            DecodeError::MetricName {
                payload_len: 0,
                reason: "truncated length prefix"
            }
        );
    }

    #[test]
    fn rejects_truncated_tag_value() {
        let mut bytes = encode(&MetricName::new("cpu").with_tag("host", "abc"));
        bytes.pop();
        let mut decoded = MetricName::default();
        assert!(decoded.unmarshal(&bytes).is_err());
    }

    #[test]
    fn rejects_dangling_key_without_value() {
        let mut bytes = encode(&MetricName::new("cpu"));
        bytes.extend_from_slice(&[0, 1, b'k']);
        let mut decoded = MetricName::default();
        assert!(decoded.unmarshal(&bytes).is_err());
    }

    #[test]
    fn rejects_empty_tag_key_both_ways() {
        let name = MetricName::new("cpu").with_tag("", "v");
        assert_eq!(name.marshal(&mut Vec::new()), Err("empty tag key"));

        let bytes = [0, 0, 0, 0, 0, 1, b'v'];
        let mut decoded = MetricName::default();
        assert!(decoded.unmarshal(&bytes).is_err());
    }

    #[test]
    fn display_renders_prometheus_style() {
        let name = MetricName::new("cpu").with_tag("host", "a");
        assert_eq!(name.to_string(), "cpu{host=\"a\"}");
    }
}
