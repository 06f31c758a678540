//! Stream error type.
//!
//! Every failure in this crate is a value. The C boundary collapses these
//! into the classic sentinels (`-1`, `NULL`, `EOF`); Rust callers get the
//! typed reason.

use std::io;

use thiserror::Error;

use crate::mode::Whence;

/// Failure reasons for stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The underlying stream, descriptor or mapping could not be acquired.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    /// A platform primitive failed. The handle stays open.
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
    /// Seek would move the cursor below zero or overflow.
    #[error("seek by {offset} from {whence:?} is out of range")]
    InvalidSeek { offset: i64, whence: Whence },
    /// Read attempted with the cursor already beyond the end of a mapping.
    #[error("cursor {cursor} is past the end of the {len}-byte mapping")]
    PastEnd { cursor: u64, len: u64 },
    /// Write or truncate on a read-only memory-mapped stream.
    #[error("stream is mapped read-only")]
    ReadOnly,
    /// Fixed-length read obtained fewer bytes than requested.
    #[error("short read: wanted {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
    /// Whole-buffer write transferred fewer bytes than requested.
    #[error("short write: wanted {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },
    /// Formatted output does not fit the render buffer.
    #[error("formatted output exceeds the {limit}-byte render buffer")]
    FormatOverflow { limit: usize },
    /// A `Display` implementation reported an error while rendering.
    #[error("formatting failed")]
    Format,
    /// Growing a line or file buffer failed.
    #[error("out of memory")]
    OutOfMemory,
    /// The backend that owns the stream does not implement the operation.
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
    /// A registered backend reported failure without further detail.
    #[error("backend {op} failed")]
    Backend { op: &'static str },
    /// NULL handle passed across the C boundary.
    #[error("null stream handle")]
    NullHandle,
    /// Path contains an interior NUL or is not valid UTF-8.
    #[error("invalid path")]
    InvalidPath,
}

impl StreamError {
    /// Capture `errno` for a failed primitive.
    pub(crate) fn last_os(op: &'static str) -> Self {
        Self::Io {
            op,
            source: io::Error::last_os_error(),
        }
    }

    pub(crate) fn io(op: &'static str, source: io::Error) -> Self {
        Self::Io { op, source }
    }

    /// Raw OS error code, if the failure came from the platform.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Open { source, .. } | Self::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type StreamResult<T> = Result<T, StreamError>;

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Open { source, .. } | StreamError::Io { source, .. } => source,
            StreamError::InvalidSeek { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            StreamError::ShortRead { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            StreamError::ShortWrite { .. } => io::Error::new(io::ErrorKind::WriteZero, err),
            StreamError::ReadOnly => io::Error::new(io::ErrorKind::PermissionDenied, err),
            StreamError::OutOfMemory => io::Error::new(io::ErrorKind::OutOfMemory, err),
            StreamError::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, err),
            other => io::Error::other(other),
        }
    }
}
