//! Wire formats understood by the ingestion core.
//!
//! Only the native import format lives here today: a 16-byte time range
//! header followed by length-prefixed `(metric name, block)` frame pairs.

pub mod native;

pub use native::{FrameReader, NativeStreamWriter, ReadOutcome};
