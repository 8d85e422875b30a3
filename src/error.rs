//! Error types for the bw64 crate

use crate::util::FourCC;
use thiserror::Error;

/// Result type alias for bw64 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bw64
#[derive(Error, Debug)]
pub enum Error {
    /// IO error from the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File contents violate the BW64/WAVE grammar
    #[error("Format error: {0}")]
    Format(String),

    /// Caller-supplied parameters violate format constraints
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A mandatory chunk is absent
    #[error("Missing chunk: '{0}'")]
    MissingChunk(FourCC),

    /// A patched chunk outgrew its reserved placeholder
    #[error("'{chunk}' chunk is too large ({needed} bytes) to overwrite its reserved region ({reserved} bytes)")]
    CapacityExceeded {
        chunk: FourCC,
        needed: u64,
        reserved: u64,
    },
}

impl Error {
    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
