//! Encoding free functions over the native engine.

use crate::config::{CodecConfig, EncodeOptions};
use crate::engine::{CodecEngine, LibjxlEngine};
use crate::error::Result;
use crate::pool;
use crate::types::PixelBuffer;

/// Encode pixels to a JXL codestream with the native engine.
///
/// Unset fields in `options` use the crate defaults (effort 7,
/// distance 1.0, lossy).
///
/// # Example
///
/// ```rust,no_run
/// use jxlx::{EncodeOptions, PixelBuffer};
///
/// let image = PixelBuffer::new(64, 64, 3, vec![0u8; 64 * 64 * 3])?;
/// let jxl = jxlx::encode(&image, &EncodeOptions::new().lossless(true))?;
/// # Ok::<(), jxlx::Error>(())
/// ```
pub fn encode(image: &PixelBuffer, options: &EncodeOptions) -> Result<Vec<u8>> {
    let params = CodecConfig::default().resolve(options);
    LibjxlEngine::new().encode(image, &params, options.metadata())
}

/// Encode pixels to a JPEG stream with the native engine.
///
/// A 4th (alpha) channel is dropped.
pub fn encode_jpeg(image: &PixelBuffer, quality: u8) -> Result<Vec<u8>> {
    LibjxlEngine::new().encode_jpeg(image, quality)
}

/// Non-blocking [`encode`], on the shared pool.
pub async fn encode_async(image: &PixelBuffer, options: &EncodeOptions) -> Result<Vec<u8>> {
    let params = CodecConfig::default().resolve(options);
    let metadata = options.metadata().clone();
    let image = image.clone();
    let rx = pool::shared()?.dispatch(move || LibjxlEngine::new().encode(&image, &params, &metadata));
    pool::resolve(rx).await
}

/// Non-blocking [`encode_jpeg`], on the shared pool.
pub async fn encode_jpeg_async(image: &PixelBuffer, quality: u8) -> Result<Vec<u8>> {
    let image = image.clone();
    let rx = pool::shared()?.dispatch(move || LibjxlEngine::new().encode_jpeg(&image, quality));
    pool::resolve(rx).await
}
