//! Request-body handling in front of the frame reader.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use flate2::read::MultiGzDecoder;

/// Body encoding announced by the enclosing request's `Content-Encoding`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentEncoding {
    #[default]
    Identity,
    Gzip,
}

impl ContentEncoding {
    /// Maps a `Content-Encoding` header value; anything other than gzip is read as-is.
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(value) if value.trim().eq_ignore_ascii_case("gzip") => Self::Gzip,
            _ => Self::Identity,
        }
    }
}

impl FromStr for ContentEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "identity" | "none" => Ok(Self::Identity),
            "gzip" => Ok(Self::Gzip),
            other => Err(format!("unsupported content encoding `{other}`")),
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("identity"),
            Self::Gzip => f.write_str("gzip"),
        }
    }
}

/// Wraps `body` so that reads yield the decoded stream.
///
/// Gzip members are decoded back to back, so concatenated gzip bodies read as
/// one stream. Corrupt compressed data surfaces as an I/O error on a later read.
pub fn decode_body<'a, R: Read + 'a>(body: R, encoding: ContentEncoding) -> Box<dyn Read + 'a> {
    match encoding {
        ContentEncoding::Identity => Box::new(body),
        ContentEncoding::Gzip => Box::new(MultiGzDecoder::new(body)),
    }
}
