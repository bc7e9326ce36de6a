//! Core types for image data, metadata, and codestream identification.

use core::fmt;

use imgref::ImgRef;
use rgb::{ComponentBytes, RGB8, RGBA8};

use crate::error::{Error, Result};

/// An owned 8-bit image laid out as `(height, width, channels)`.
///
/// Channel counts follow the codec contract: 1 (grayscale), 3 (RGB) or
/// 4 (RGBA). Rows are contiguous; the byte length is always exactly
/// `height * width * channels`.
///
/// # Example
///
/// ```rust
/// use jxlx::PixelBuffer;
///
/// let pixels = PixelBuffer::new(2, 2, 3, vec![0u8; 2 * 2 * 3])?;
/// assert_eq!(pixels.shape(), (2, 2, 3));
/// # Ok::<(), jxlx::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a pixel buffer from raw interleaved bytes.
    ///
    /// Fails with [`Error::InvalidInput`] if `channels` is not 1, 3 or 4,
    /// or if `data.len() != width * height * channels`.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(Error::InvalidInput(format!(
                "expected 1 (gray), 3 (RGB) or 4 (RGBA) channels, got {}",
                channels
            )));
        }
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(channels as usize);
        if data.len() != expected {
            return Err(Error::InvalidInput(format!(
                "buffer length mismatch: got {}, expected {} ({}x{}x{})",
                data.len(),
                expected,
                height,
                width,
                channels
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Create a buffer from an imgref RGB image. Row padding is stripped.
    #[must_use]
    pub fn from_rgb(img: ImgRef<'_, RGB8>) -> Self {
        let mut data = Vec::with_capacity(img.width() * img.height() * 3);
        for row in img.rows() {
            data.extend_from_slice(row.as_bytes());
        }
        Self {
            width: img.width() as u32,
            height: img.height() as u32,
            channels: 3,
            data,
        }
    }

    /// Create a buffer from an imgref RGBA image. Row padding is stripped.
    #[must_use]
    pub fn from_rgba(img: ImgRef<'_, RGBA8>) -> Self {
        let mut data = Vec::with_capacity(img.width() * img.height() * 4);
        for row in img.rows() {
            data.extend_from_slice(row.as_bytes());
        }
        Self {
            width: img.width() as u32,
            height: img.height() as u32,
            channels: 4,
            data,
        }
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of interleaved channels (1, 3 or 4).
    #[must_use]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// `(height, width, channels)`, in array-shape order.
    #[must_use]
    pub fn shape(&self) -> (u32, u32, u8) {
        (self.height, self.width, self.channels)
    }

    /// Interleaved sample bytes, row-major.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning the sample bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Sidecar metadata payloads carried through encode and decode.
///
/// A fixed-key map: each field is present only when the corresponding box
/// was supplied at encode time (or found in the stream on decode). Decoding
/// a stream without metadata yields an empty value, never a missing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// EXIF payload (`Exif` box).
    pub exif: Option<Vec<u8>>,
    /// XMP payload (`xml ` box).
    pub xmp: Option<Vec<u8>>,
    /// JUMBF payload (`jumb` box).
    pub jumbf: Option<Vec<u8>>,
}

impl Metadata {
    /// True when no payload is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.xmp.is_none() && self.jumbf.is_none()
    }
}

/// Codestream format, identified from signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Format {
    /// JPEG XL, bare codestream or ISOBMFF container.
    Jxl,
    /// Legacy JPEG.
    Jpeg,
}

/// JXL bare codestream signature.
const JXL_CODESTREAM_SIG: [u8; 2] = [0xFF, 0x0A];
/// JXL ISOBMFF container signature (`JXL ` box).
const JXL_CONTAINER_SIG: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x4A, 0x58, 0x4C, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];
/// JPEG SOI marker.
const JPEG_SIG: [u8; 2] = [0xFF, 0xD8];

impl Format {
    /// Identify a codestream from its leading signature bytes.
    ///
    /// Returns `None` when the bytes match neither format. This is a cheap
    /// sniff of the documented signatures; it does not validate the stream.
    ///
    /// # Example
    ///
    /// ```rust
    /// use jxlx::Format;
    ///
    /// assert_eq!(Format::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(Format::Jpeg));
    /// assert_eq!(Format::detect(&[0xFF, 0x0A]), Some(Format::Jxl));
    /// assert_eq!(Format::detect(b"not an image"), None);
    /// ```
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Format> {
        if data.starts_with(&JXL_CODESTREAM_SIG) || data.starts_with(&JXL_CONTAINER_SIG) {
            Some(Format::Jxl)
        } else if data.starts_with(&JPEG_SIG) {
            Some(Format::Jpeg)
        } else {
            None
        }
    }
}

/// Engine version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
