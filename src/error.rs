//! Error types
//!
//! Only the signature errors are fatal. `InsufficientData` ends iteration
//! cleanly and `MalformedNalStructure` is recovered inside the tag it occurs in.

use std::io;

use thiserror::Error;

/// Result type for demuxer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for demuxer operations
#[derive(Debug, Error)]
pub enum Error {
    /// The signature is not FLV and not any container we recognise
    #[error("{source_name} isn't a FLV file")]
    NotThisFormat { source_name: String },

    /// The signature belongs to a different, known container
    #[error("{source_name} is a {container} file, not FLV")]
    WrongContainer {
        source_name: String,
        container: &'static str,
    },

    /// Fewer bytes are available than a field requires
    #[error("insufficient data: need {needed} bytes, have {available}")]
    InsufficientData { needed: u64, available: u64 },

    /// A declared NAL length or count runs past the end of the tag
    #[error("malformed NAL structure at offset {offset}: need {needed} bytes, have {available}")]
    MalformedNalStructure {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create an insufficient data error
    pub fn insufficient(needed: u64, available: u64) -> Self {
        Self::InsufficientData { needed, available }
    }

    /// Create a malformed NAL structure error
    pub fn malformed(offset: usize, needed: usize, available: usize) -> Self {
        Self::MalformedNalStructure {
            offset,
            needed,
            available,
        }
    }

    /// True for errors that mean "no more data yet" rather than a failure
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, Error::InsufficientData { .. })
    }
}
