//! Cross-format transcoding free functions over the native engine.

use crate::config::DEFAULT_EFFORT;
use crate::engine::{CodecEngine, LibjxlEngine};
use crate::error::Result;
use crate::pool;

/// Losslessly recompress a JPEG stream into a JXL codestream.
///
/// The original JPEG is embedded bit-for-bit and can be recovered with
/// [`jxl_to_jpeg`]. `effort` falls back to [`DEFAULT_EFFORT`] when `None`.
/// Fails with [`crate::Error::CorruptStream`] when the input is not a
/// valid JPEG stream.
pub fn jpeg_to_jxl(data: &[u8], effort: Option<u32>) -> Result<Vec<u8>> {
    LibjxlEngine::new().jpeg_to_jxl(data, effort.unwrap_or(DEFAULT_EFFORT))
}

/// Reconstruct the original JPEG bytes from a transcoded JXL stream.
///
/// Fails with [`crate::Error::NotReconstructible`] when the stream was
/// encoded from raw pixels rather than via [`jpeg_to_jxl`].
pub fn jxl_to_jpeg(data: &[u8]) -> Result<Vec<u8>> {
    LibjxlEngine::new().jxl_to_jpeg(data)
}

/// Non-blocking [`jpeg_to_jxl`], on the shared pool.
pub async fn jpeg_to_jxl_async(data: &[u8], effort: Option<u32>) -> Result<Vec<u8>> {
    let data = data.to_vec();
    let effort = effort.unwrap_or(DEFAULT_EFFORT);
    let rx = pool::shared()?.dispatch(move || LibjxlEngine::new().jpeg_to_jxl(&data, effort));
    pool::resolve(rx).await
}

/// Non-blocking [`jxl_to_jpeg`], on the shared pool.
pub async fn jxl_to_jpeg_async(data: &[u8]) -> Result<Vec<u8>> {
    let data = data.to_vec();
    let rx = pool::shared()?.dispatch(move || LibjxlEngine::new().jxl_to_jpeg(&data));
    pool::resolve(rx).await
}
