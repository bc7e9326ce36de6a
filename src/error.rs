//! Error types for jxlx operations.

use std::path::PathBuf;

/// Result type for jxlx operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for jxlx operations.
///
/// The facade itself only ever produces [`Error::NotFound`],
/// [`Error::Closed`] and [`Error::PoolTerminated`]; every other variant is
/// an engine failure passed through unchanged. There are no retries and no
/// silent recovery.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input path does not exist. Raised before any engine call.
    #[error("no such file: '{}'", .0.display())]
    NotFound(PathBuf),
    /// Operation invoked on a closed codec handle.
    #[error("cannot use a closed codec")]
    Closed,
    /// Wrong buffer shape, byte length, or unsupported channel count.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Malformed or unparsable codestream on decode/transcode.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),
    /// `jxl_to_jpeg` on a JXL stream with no embedded JPEG codestream.
    #[error("JXL data does not contain a reconstructible JPEG codestream")]
    NotReconstructible,
    /// Any other native engine failure, message preserved verbatim.
    #[error("engine error: {0}")]
    Engine(String),
    /// Filesystem failure other than a missing input path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The worker pool was torn down before the operation reported back.
    #[error("worker pool shut down before the operation completed")]
    PoolTerminated,
}

impl Error {
    /// True for the closed-handle state error.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }

    /// True for the missing-input-path error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
