//! Unified error type.

use std::fmt;

use crate::middleware::compression::Encoding;

/// The error type returned by plait's fallible operations.
///
/// Dispatch itself never fails: application-level errors (404, 422, etc.)
/// are written to the response sink. This type surfaces setup and
/// infrastructure failures: invalid route patterns, binding a port, writing a
/// log sink, or running out of pooled compressors.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    InvalidRoute { path: String, reason: String },
    PoolExhausted(Encoding),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::InvalidRoute { path, reason } => write!(f, "invalid route `{path}`: {reason}"),
            Self::PoolExhausted(encoding) => write!(f, "no {encoding} compressor available"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
