//! Decoding free functions over the native engine.

use crate::engine::{CodecEngine, LibjxlEngine};
use crate::error::Result;
use crate::pool;
use crate::types::{Metadata, PixelBuffer};

/// Decode a JXL codestream to pixels with the native engine.
pub fn decode(data: &[u8]) -> Result<PixelBuffer> {
    Ok(LibjxlEngine::new().decode(data, false)?.pixels)
}

/// Decode a JXL codestream to pixels plus extracted metadata.
///
/// The metadata map contains exactly the keys present in the stream; a
/// stream without metadata yields an empty map.
pub fn decode_with_metadata(data: &[u8]) -> Result<(PixelBuffer, Metadata)> {
    let decoded = LibjxlEngine::new().decode(data, true)?;
    Ok((decoded.pixels, decoded.metadata.unwrap_or_default()))
}

/// Decode a JPEG stream to RGB pixels with the native engine.
pub fn decode_jpeg(data: &[u8]) -> Result<PixelBuffer> {
    LibjxlEngine::new().decode_jpeg(data)
}

/// Non-blocking [`decode`], on the shared pool.
pub async fn decode_async(data: &[u8]) -> Result<PixelBuffer> {
    let data = data.to_vec();
    let rx = pool::shared()?.dispatch(move || Ok(LibjxlEngine::new().decode(&data, false)?.pixels));
    pool::resolve(rx).await
}

/// Non-blocking [`decode_with_metadata`], on the shared pool.
pub async fn decode_with_metadata_async(data: &[u8]) -> Result<(PixelBuffer, Metadata)> {
    let data = data.to_vec();
    let rx = pool::shared()?.dispatch(move || {
        let decoded = LibjxlEngine::new().decode(&data, true)?;
        Ok((decoded.pixels, decoded.metadata.unwrap_or_default()))
    });
    pool::resolve(rx).await
}

/// Non-blocking [`decode_jpeg`], on the shared pool.
pub async fn decode_jpeg_async(data: &[u8]) -> Result<PixelBuffer> {
    let data = data.to_vec();
    let rx = pool::shared()?.dispatch(move || LibjxlEngine::new().decode_jpeg(&data));
    pool::resolve(rx).await
}
