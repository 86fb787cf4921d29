/// Size of the `[min, max]` timestamp header that opens every stream.
pub const TIME_RANGE_HEADER_SIZE: usize = 16;
/// Size of the big-endian length prefix in front of every frame.
pub const FRAME_LENGTH_SIZE: usize = 4;
/// Largest payload a single frame may declare.
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Default capacity of the buffered reader wrapped around the request body.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024 * 1024;
/// Default work queue slots per decode worker.
pub const DEFAULT_QUEUE_DEPTH_PER_WORKER: usize = 8;
