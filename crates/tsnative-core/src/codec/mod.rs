//! Decoders for the two payloads inside every record.

pub mod block;
pub mod metric_name;
pub mod varint;

pub use block::{BlockScratch, marshal_block, unmarshal_block};
pub use metric_name::{MetricName, Tag};
