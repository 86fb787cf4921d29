mod consts;
mod frame;
mod headers;
mod writer;

pub use consts::{
    DEFAULT_QUEUE_DEPTH_PER_WORKER, DEFAULT_READ_BUFFER_SIZE, FRAME_LENGTH_SIZE, MAX_FRAME_SIZE,
    TIME_RANGE_HEADER_SIZE,
};
pub use frame::{FrameReader, ReadOutcome};
pub use writer::NativeStreamWriter;
