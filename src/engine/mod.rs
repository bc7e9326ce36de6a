//! The opaque codec engine boundary.
//!
//! Everything pixel- and bitstream-shaped happens behind [`CodecEngine`]:
//! six primitive operations plus a version query. The facade never looks
//! inside a codestream (beyond the cheap [`crate::Format::detect`] sniff
//! utility) and never post-processes an engine result. Keeping the seam
//! this narrow lets the lifecycle, dispatch and configuration layers be
//! exercised against any substitute engine.

use crate::config::EncodeParams;
use crate::error::Result;
use crate::types::{Metadata, PixelBuffer, Version};

#[cfg(feature = "libjxl")]
mod libjxl;

#[cfg(feature = "libjxl")]
pub use libjxl::LibjxlEngine;

/// A decoded image and, when requested, its sidecar metadata.
///
/// `metadata` is `Some` exactly when decoding was asked to extract
/// metadata — possibly an empty map when the stream carries none — and
/// `None` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded pixels.
    pub pixels: PixelBuffer,
    /// Extracted metadata, present only when requested.
    pub metadata: Option<Metadata>,
}

/// The six primitive codec operations, plus a version query.
///
/// Implementations must be thread-safe: the facade invokes these from the
/// caller's thread (blocking forms) and from worker-pool threads
/// (non-blocking forms), concurrently.
///
/// Error contract: wrong buffer shapes and channel counts surface as
/// [`crate::Error::InvalidInput`]; unparsable codestreams as
/// [`crate::Error::CorruptStream`]; a JXL stream without an embedded JPEG
/// codestream handed to [`CodecEngine::jxl_to_jpeg`] as
/// [`crate::Error::NotReconstructible`]; anything else native as
/// [`crate::Error::Engine`].
pub trait CodecEngine: Send + Sync {
    /// Encode pixels to a JXL codestream, embedding any metadata payloads.
    fn encode(
        &self,
        image: &PixelBuffer,
        params: &EncodeParams,
        metadata: &Metadata,
    ) -> Result<Vec<u8>>;

    /// Decode a JXL codestream; extract metadata boxes when asked.
    fn decode(&self, data: &[u8], with_metadata: bool) -> Result<Decoded>;

    /// Encode pixels to a JPEG stream. A 4th (alpha) channel is dropped.
    fn encode_jpeg(&self, image: &PixelBuffer, quality: u8) -> Result<Vec<u8>>;

    /// Decode a JPEG stream to RGB pixels.
    fn decode_jpeg(&self, data: &[u8]) -> Result<PixelBuffer>;

    /// Losslessly recompress a JPEG stream into a JXL codestream that
    /// embeds the original JPEG bit-for-bit.
    fn jpeg_to_jxl(&self, data: &[u8], effort: u32) -> Result<Vec<u8>>;

    /// Reconstruct the original JPEG bytes from a JXL codestream produced
    /// by [`CodecEngine::jpeg_to_jxl`].
    fn jxl_to_jpeg(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Engine library version.
    fn version(&self) -> Version;
}
