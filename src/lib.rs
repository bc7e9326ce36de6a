//! # jxlx
//!
//! Unified JPEG XL / JPEG codec facade: encode, decode, and lossless
//! cross-format transcoding in blocking and non-blocking forms, with file
//! I/O helpers and metadata passthrough.
//!
//! The pixel transforms and bitstream work happen behind the
//! [`CodecEngine`] trait — six primitive operations implemented by the
//! native binding (libjxl + libjpeg-turbo, `libjxl` feature) or by any
//! substitute. What this crate provides on top:
//!
//! - A stateful [`JxlCodec`] handle owning a bounded worker pool, with
//!   every operation in both a blocking and an `*_async` form
//! - Per-call configuration overrides resolved against instance defaults
//! - Fail-fast open/closed lifecycle with idempotent, RAII-backed close
//! - Byte-exact JPEG↔JXL transcoding (`jxl_to_jpeg(jpeg_to_jxl(x)) == x`)
//! - EXIF/XMP/JUMBF metadata carried through encode and back out of decode
//! - Path-checked reads and ancestor-creating writes for both formats
//!
//! ## Quick start
//!
//! ```rust,no_run
//! # #[cfg(feature = "libjxl")] {
//! use jxlx::{EncodeOptions, PixelBuffer};
//!
//! let image = PixelBuffer::new(640, 480, 3, vec![0u8; 640 * 480 * 3])?;
//!
//! // One-shot free functions
//! let jxl = jxlx::encode(&image, &EncodeOptions::new().lossless(true))?;
//! let back = jxlx::decode(&jxl)?;
//! assert_eq!(back.shape(), image.shape());
//!
//! // Lossless JPEG recompression, reversible bit-for-bit
//! let jpeg = jxlx::encode_jpeg(&image, 95)?;
//! let packed = jxlx::jpeg_to_jxl(&jpeg, None)?;
//! assert_eq!(jxlx::jxl_to_jpeg(&packed)?, jpeg);
//! # }
//! # Ok::<(), jxlx::Error>(())
//! ```
//!
//! ## Handle API
//!
//! ```rust,no_run
//! # #[cfg(feature = "libjxl")] {
//! use jxlx::{CodecConfig, EncodeOptions, JxlCodec, PixelBuffer};
//!
//! let codec = JxlCodec::new(CodecConfig::new().effort(7).threads(4))?;
//! let image = PixelBuffer::new(64, 64, 3, vec![0u8; 64 * 64 * 3])?;
//! let jxl = codec.encode(&image, &EncodeOptions::new().effort(9))?;
//! // closed on drop; or explicitly:
//! codec.close();
//! # }
//! # Ok::<(), jxlx::Error>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

mod config;
mod error;
mod handle;
mod io;
mod pool;
mod types;

pub mod engine;

#[cfg(feature = "libjxl")]
mod decode;

#[cfg(feature = "libjxl")]
mod encode;

#[cfg(feature = "libjxl")]
mod transcode;

// Re-exports
pub use config::{
    CodecConfig, EncodeOptions, EncodeParams, DEFAULT_DECODING_SPEED, DEFAULT_DISTANCE,
    DEFAULT_EFFORT, DEFAULT_JPEG_QUALITY,
};
pub use engine::{CodecEngine, Decoded};
pub use error::{Error, Result};
pub use handle::JxlCodec;
pub use types::{Format, Metadata, PixelBuffer, Version};

#[cfg(feature = "libjxl")]
pub use engine::LibjxlEngine;

#[cfg(feature = "libjxl")]
pub use decode::{
    decode, decode_async, decode_jpeg, decode_jpeg_async, decode_with_metadata,
    decode_with_metadata_async,
};

#[cfg(feature = "libjxl")]
pub use encode::{encode, encode_async, encode_jpeg, encode_jpeg_async};

#[cfg(feature = "libjxl")]
pub use transcode::{jpeg_to_jxl, jpeg_to_jxl_async, jxl_to_jpeg, jxl_to_jpeg_async};

#[cfg(feature = "libjxl")]
pub use io::{
    convert_jpeg_to_jxl, convert_jpeg_to_jxl_async, convert_jxl_to_jpeg, convert_jxl_to_jpeg_async,
    read, read_async, read_jpeg, read_jpeg_async, read_with_metadata, read_with_metadata_async,
    write, write_async, write_jpeg, write_jpeg_async,
};

/// Native engine library version.
#[cfg(feature = "libjxl")]
#[must_use]
pub fn version() -> Version {
    engine::LibjxlEngine::new().version()
}

/// Raw libjxl decoder version number (`major * 1_000_000 + minor * 1_000 +
/// patch`).
#[cfg(feature = "libjxl")]
#[must_use]
pub fn decoder_version() -> u32 {
    unsafe { jpegxl_sys::JxlDecoderVersion() }
}

/// Raw libjxl encoder version number (`major * 1_000_000 + minor * 1_000 +
/// patch`).
#[cfg(feature = "libjxl")]
#[must_use]
pub fn encoder_version() -> u32 {
    unsafe { jpegxl_sys::JxlEncoderVersion() }
}
