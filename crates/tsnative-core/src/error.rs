use std::fmt;

use thiserror::Error;

/// Which half of a record a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    MetricName,
    Block,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MetricName => f.write_str("metricName"),
            Self::Block => f.write_str("native block"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot read {what}: {source}")]
    StreamRead {
        what: String,
        #[source]
        source: std::io::Error,
    },
    #[error("too big {frame} size; got {size}; shouldn't exceed {limit}")]
    FrameTooLarge {
        frame: FrameKind,
        size: u64,
        limit: u32,
    },
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("cannot process native block: {0}")]
    Callback(anyhow::Error),
    #[error("decode worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<IngestError>,
    },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl IngestError {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn stream_read(what: impl Into<String>, source: std::io::Error) -> Self {
        Self::StreamRead {
            what: what.into(),
            source,
        }
    }

    /// Returns true when the error aborts a whole stream rather than a single record.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Io(_)
            | Self::StreamRead { .. }
            | Self::FrameTooLarge { .. }
            | Self::InvalidFormat(_)
            | Self::WorkerPanicked(_)
            | Self::Other(_) => true,
            Self::Decode(_) | Self::Callback(_) => false,
            Self::Context { source, .. } => source.is_fatal(),
        }
    }
}

/// Per-record payload failure. The record is dropped and the stream keeps flowing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("cannot unmarshal metricName from {payload_len} bytes: {reason}")]
    MetricName {
        payload_len: usize,
        reason: &'static str,
    },
    #[error("cannot unmarshal native block from {payload_len} bytes: {reason}")]
    Block {
        payload_len: usize,
        reason: &'static str,
    },
    #[error(
        "unexpected non-empty tail left after unmarshaling native block from {payload_len} bytes; len(tail)={tail_len} bytes"
    )]
    TrailingBytes { payload_len: usize, tail_len: usize },
}
