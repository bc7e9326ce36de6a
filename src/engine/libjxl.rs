//! Native engine binding: libjxl (via jpegxl-sys) for JXL, libjpeg-turbo
//! (via turbojpeg) for JPEG.
//!
//! Each operation builds a fresh encoder/decoder; libjxl runs
//! single-threaded per call so the handle's worker pool stays the one
//! concurrency bound.

use core::ffi::c_int;
use core::mem::MaybeUninit;
use core::ptr;

use jpegxl_sys as jxl;

use crate::config::EncodeParams;
use crate::engine::{CodecEngine, Decoded};
use crate::error::{Error, Result};
use crate::types::{Metadata, PixelBuffer, Version};

/// The default engine: libjxl + libjpeg-turbo.
///
/// Stateless; safe to share across threads. Construct one per process or
/// per handle, it makes no difference.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibjxlEngine;

impl LibjxlEngine {
    /// Create the engine binding.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Runtime libjxl version, decoded from the `JxlDecoderVersion` encoding.
pub(crate) fn runtime_version() -> Version {
    let v = unsafe { jxl::JxlDecoderVersion() };
    Version {
        major: v / 1_000_000,
        minor: (v / 1_000) % 1_000,
        patch: v % 1_000,
    }
}

struct EncoderGuard(*mut jxl::JxlEncoder);

impl EncoderGuard {
    fn create() -> Result<Self> {
        let enc = unsafe { jxl::JxlEncoderCreate(ptr::null()) };
        if enc.is_null() {
            return Err(Error::Engine("JxlEncoderCreate failed".into()));
        }
        Ok(Self(enc))
    }
}

impl Drop for EncoderGuard {
    fn drop(&mut self) {
        unsafe { jxl::JxlEncoderDestroy(self.0) };
    }
}

struct DecoderGuard(*mut jxl::JxlDecoder);

impl DecoderGuard {
    fn create() -> Result<Self> {
        let dec = unsafe { jxl::JxlDecoderCreate(ptr::null()) };
        if dec.is_null() {
            return Err(Error::Engine("JxlDecoderCreate failed".into()));
        }
        Ok(Self(dec))
    }
}

impl Drop for DecoderGuard {
    fn drop(&mut self) {
        unsafe { jxl::JxlDecoderDestroy(self.0) };
    }
}

fn enc_check(status: jxl::JxlEncoderStatus, what: &str) -> Result<()> {
    if status != jxl::JxlEncoderStatus::Success {
        return Err(Error::Engine(format!("{} failed", what)));
    }
    Ok(())
}

/// Drain the encoder into a growable output buffer.
fn process_output(enc: &EncoderGuard, initial_size: usize) -> Result<Vec<u8>> {
    let mut compressed = vec![0u8; initial_size.max(4096)];
    let mut next_out = compressed.as_mut_ptr();
    let mut avail_out = compressed.len();

    loop {
        let status = unsafe { jxl::JxlEncoderProcessOutput(enc.0, &mut next_out, &mut avail_out) };
        match status {
            jxl::JxlEncoderStatus::NeedMoreOutput => {
                let offset = next_out as usize - compressed.as_mut_ptr() as usize;
                compressed.resize(compressed.len() * 2, 0);
                next_out = unsafe { compressed.as_mut_ptr().add(offset) };
                avail_out = compressed.len() - offset;
            }
            jxl::JxlEncoderStatus::Success => {
                let written = next_out as usize - compressed.as_mut_ptr() as usize;
                compressed.truncate(written);
                return Ok(compressed);
            }
            _ => return Err(Error::Engine("JxlEncoderProcessOutput failed".into())),
        }
    }
}

fn pixel_format(channels: u8) -> jxl::JxlPixelFormat {
    jxl::JxlPixelFormat {
        num_channels: u32::from(channels),
        data_type: jxl::JxlDataType::Uint8,
        endianness: jxl::JxlEndianness::Little,
        align: 0,
    }
}

impl CodecEngine for LibjxlEngine {
    fn encode(
        &self,
        image: &PixelBuffer,
        params: &EncodeParams,
        metadata: &Metadata,
    ) -> Result<Vec<u8>> {
        let channels = image.channels();
        if channels != 3 && channels != 4 {
            return Err(Error::InvalidInput(format!(
                "JXL encode requires 3 (RGB) or 4 (RGBA) channels, got {}",
                channels
            )));
        }

        let enc = EncoderGuard::create()?;

        if !metadata.is_empty() {
            enc_check(
                unsafe { jxl::JxlEncoderUseBoxes(enc.0) },
                "JxlEncoderUseBoxes",
            )?;
        }

        let settings = unsafe { jxl::JxlEncoderFrameSettingsCreate(enc.0, ptr::null()) };
        unsafe {
            jxl::JxlEncoderFrameSettingsSetOption(
                settings,
                jxl::JxlEncoderFrameSettingId::Effort,
                params.effort as i64,
            );
            jxl::JxlEncoderFrameSettingsSetOption(
                settings,
                jxl::JxlEncoderFrameSettingId::DecodingSpeed,
                params.decoding_speed as i64,
            );
            if params.lossless {
                jxl::JxlEncoderSetFrameLossless(settings, jxl::JxlBool::True);
            } else {
                jxl::JxlEncoderSetFrameDistance(settings, params.distance);
            }
        }

        let mut basic_info = unsafe {
            let mut info = MaybeUninit::<jxl::JxlBasicInfo>::zeroed();
            jxl::JxlEncoderInitBasicInfo(info.as_mut_ptr());
            info.assume_init()
        };
        basic_info.xsize = image.width();
        basic_info.ysize = image.height();
        basic_info.bits_per_sample = 8;
        basic_info.uses_original_profile = jxl::JxlBool::True;
        if channels == 4 {
            basic_info.num_extra_channels = 1;
            basic_info.alpha_bits = 8;
        }
        enc_check(
            unsafe { jxl::JxlEncoderSetBasicInfo(enc.0, &basic_info) },
            "JxlEncoderSetBasicInfo",
        )?;

        let color_encoding = unsafe {
            let mut enc_color = MaybeUninit::<jxl::JxlColorEncoding>::zeroed();
            jxl::JxlColorEncodingSetToSRGB(enc_color.as_mut_ptr(), false);
            enc_color.assume_init()
        };
        enc_check(
            unsafe { jxl::JxlEncoderSetColorEncoding(enc.0, &color_encoding) },
            "JxlEncoderSetColorEncoding",
        )?;

        let format = pixel_format(channels);
        let bytes = image.as_bytes();
        enc_check(
            unsafe {
                jxl::JxlEncoderAddImageFrame(
                    settings,
                    &format,
                    bytes.as_ptr().cast(),
                    bytes.len(),
                )
            },
            "JxlEncoderAddImageFrame",
        )?;

        if !metadata.is_empty() {
            unsafe { jxl::JxlEncoderCloseFrames(enc.0) };

            if let Some(exif) = &metadata.exif {
                // The Exif box carries a 4-byte TIFF header offset prefix
                let mut boxed = vec![0u8; 4 + exif.len()];
                boxed[4..].copy_from_slice(exif);
                enc_check(
                    unsafe {
                        jxl::JxlEncoderAddBox(
                            enc.0,
                            b"Exif".as_ptr().cast(),
                            boxed.as_ptr(),
                            boxed.len(),
                            jxl::JxlBool::True as c_int,
                        )
                    },
                    "JxlEncoderAddBox(Exif)",
                )?;
            }
            if let Some(xmp) = &metadata.xmp {
                enc_check(
                    unsafe {
                        jxl::JxlEncoderAddBox(
                            enc.0,
                            b"xml ".as_ptr().cast(),
                            xmp.as_ptr(),
                            xmp.len(),
                            jxl::JxlBool::True as c_int,
                        )
                    },
                    "JxlEncoderAddBox(xml)",
                )?;
            }
            if let Some(jumbf) = &metadata.jumbf {
                enc_check(
                    unsafe {
                        jxl::JxlEncoderAddBox(
                            enc.0,
                            b"jumb".as_ptr().cast(),
                            jumbf.as_ptr(),
                            jumbf.len(),
                            jxl::JxlBool::True as c_int,
                        )
                    },
                    "JxlEncoderAddBox(jumb)",
                )?;
            }

            unsafe { jxl::JxlEncoderCloseBoxes(enc.0) };
        } else {
            unsafe { jxl::JxlEncoderCloseInput(enc.0) };
        }

        process_output(&enc, bytes.len() / 2)
    }

    fn decode(&self, data: &[u8], with_metadata: bool) -> Result<Decoded> {
        let dec = DecoderGuard::create()?;

        let mut events = jxl::JxlDecoderStatus::BasicInfo as c_int
            | jxl::JxlDecoderStatus::FullImage as c_int;
        if with_metadata {
            events |= jxl::JxlDecoderStatus::Box as c_int;
            unsafe { jxl::JxlDecoderSetDecompressBoxes(dec.0, jxl::JxlBool::True) };
        }
        if unsafe { jxl::JxlDecoderSubscribeEvents(dec.0, events) } != jxl::JxlDecoderStatus::Success
        {
            return Err(Error::Engine("JxlDecoderSubscribeEvents failed".into()));
        }

        unsafe {
            jxl::JxlDecoderSetInput(dec.0, data.as_ptr(), data.len());
            jxl::JxlDecoderCloseInput(dec.0);
        }

        let mut pixels: Vec<u8> = Vec::new();
        let mut info: Option<jxl::JxlBasicInfo> = None;
        let mut channels = 0u8;

        const BOX_CHUNK: usize = 65536;
        let mut boxes: Vec<([u8; 4], Vec<u8>)> = Vec::new();
        let mut current_box: Option<[u8; 4]> = None;
        let mut box_buffer: Vec<u8> = Vec::new();

        let flush_box = |buf: &mut Vec<u8>,
                         current: &mut Option<[u8; 4]>,
                         boxes: &mut Vec<([u8; 4], Vec<u8>)>,
                         dec: &DecoderGuard| {
            if let Some(kind) = current.take() {
                let remaining = unsafe { jxl::JxlDecoderReleaseBoxBuffer(dec.0) };
                buf.truncate(buf.len() - remaining);
                boxes.push((kind, core::mem::take(buf)));
            }
        };

        loop {
            let status = unsafe { jxl::JxlDecoderProcessInput(dec.0) };
            match status {
                jxl::JxlDecoderStatus::Error => {
                    return Err(Error::CorruptStream("decoder error during decode".into()));
                }
                jxl::JxlDecoderStatus::NeedMoreInput => {
                    return Err(Error::CorruptStream(
                        "truncated JXL data: need more input".into(),
                    ));
                }
                jxl::JxlDecoderStatus::BasicInfo => {
                    let mut raw = MaybeUninit::<jxl::JxlBasicInfo>::zeroed();
                    if unsafe { jxl::JxlDecoderGetBasicInfo(dec.0, raw.as_mut_ptr()) }
                        != jxl::JxlDecoderStatus::Success
                    {
                        return Err(Error::Engine("JxlDecoderGetBasicInfo failed".into()));
                    }
                    let raw = unsafe { raw.assume_init() };
                    channels =
                        (raw.num_color_channels + u32::from(raw.alpha_bits > 0)) as u8;
                    pixels = vec![
                        0u8;
                        raw.xsize as usize * raw.ysize as usize * channels as usize
                    ];
                    info = Some(raw);
                }
                jxl::JxlDecoderStatus::NeedImageOutBuffer => {
                    let format = pixel_format(channels);
                    if unsafe {
                        jxl::JxlDecoderSetImageOutBuffer(
                            dec.0,
                            &format,
                            pixels.as_mut_ptr().cast(),
                            pixels.len(),
                        )
                    } != jxl::JxlDecoderStatus::Success
                    {
                        return Err(Error::Engine("JxlDecoderSetImageOutBuffer failed".into()));
                    }
                }
                jxl::JxlDecoderStatus::Box => {
                    flush_box(&mut box_buffer, &mut current_box, &mut boxes, &dec);

                    let mut box_type = [0u8; 4];
                    if unsafe {
                        jxl::JxlDecoderGetBoxType(
                            dec.0,
                            box_type.as_mut_ptr().cast(),
                            jxl::JxlBool::True,
                        )
                    } != jxl::JxlDecoderStatus::Success
                    {
                        continue;
                    }
                    if matches!(&box_type, b"Exif" | b"xml " | b"jumb") {
                        current_box = Some(box_type);
                        box_buffer = vec![0u8; BOX_CHUNK];
                        unsafe {
                            jxl::JxlDecoderSetBoxBuffer(
                                dec.0,
                                box_buffer.as_mut_ptr(),
                                box_buffer.len(),
                            )
                        };
                    }
                }
                jxl::JxlDecoderStatus::BoxNeedMoreOutput => {
                    let remaining = unsafe { jxl::JxlDecoderReleaseBoxBuffer(dec.0) };
                    let read = box_buffer.len() - remaining;
                    box_buffer.resize(box_buffer.len() + BOX_CHUNK, 0);
                    unsafe {
                        jxl::JxlDecoderSetBoxBuffer(
                            dec.0,
                            box_buffer.as_mut_ptr().add(read),
                            box_buffer.len() - read,
                        )
                    };
                }
                jxl::JxlDecoderStatus::FullImage => {
                    if !with_metadata {
                        break;
                    }
                }
                jxl::JxlDecoderStatus::Success => {
                    flush_box(&mut box_buffer, &mut current_box, &mut boxes, &dec);
                    break;
                }
                _ => {
                    return Err(Error::Engine(format!(
                        "unexpected decoder status {:?}",
                        status
                    )));
                }
            }
        }

        let info = info
            .ok_or_else(|| Error::CorruptStream("decoder finished without basic info".into()))?;
        let pixels = PixelBuffer::new(info.xsize, info.ysize, channels, pixels)?;

        let metadata = with_metadata.then(|| {
            let mut meta = Metadata::default();
            for (kind, payload) in boxes {
                match &kind {
                    // Strip the 4-byte TIFF header offset prefix
                    b"Exif" if payload.len() > 4 => meta.exif = Some(payload[4..].to_vec()),
                    b"xml " => meta.xmp = Some(payload),
                    b"jumb" => meta.jumbf = Some(payload),
                    _ => {}
                }
            }
            meta
        });

        Ok(Decoded { pixels, metadata })
    }

    fn encode_jpeg(&self, image: &PixelBuffer, quality: u8) -> Result<Vec<u8>> {
        let channels = image.channels();
        if channels != 3 && channels != 4 {
            return Err(Error::InvalidInput(format!(
                "JPEG encode requires 3 (RGB) or 4 (RGBA) channels, got {}",
                channels
            )));
        }

        let tj_image = turbojpeg::Image {
            pixels: image.as_bytes(),
            width: image.width() as usize,
            pitch: image.width() as usize * channels as usize,
            height: image.height() as usize,
            format: if channels == 3 {
                turbojpeg::PixelFormat::RGB
            } else {
                turbojpeg::PixelFormat::RGBA
            },
        };
        let jpeg = turbojpeg::compress(
            tj_image,
            i32::from(quality.clamp(1, 100)),
            turbojpeg::Subsamp::None,
        )
        .map_err(|e| Error::Engine(format!("JPEG compress failed: {}", e)))?;
        Ok(jpeg.to_vec())
    }

    fn decode_jpeg(&self, data: &[u8]) -> Result<PixelBuffer> {
        let image = turbojpeg::decompress(data, turbojpeg::PixelFormat::RGB)
            .map_err(|e| Error::CorruptStream(format!("JPEG decompress failed: {}", e)))?;

        let row_bytes = image.width * 3;
        let mut pixels = Vec::with_capacity(image.height * row_bytes);
        for row in 0..image.height {
            let start = row * image.pitch;
            pixels.extend_from_slice(&image.pixels[start..start + row_bytes]);
        }
        PixelBuffer::new(image.width as u32, image.height as u32, 3, pixels)
    }

    fn jpeg_to_jxl(&self, data: &[u8], effort: u32) -> Result<Vec<u8>> {
        let enc = EncoderGuard::create()?;

        enc_check(
            unsafe { jxl::JxlEncoderUseContainer(enc.0, jxl::JxlBool::True as c_int) },
            "JxlEncoderUseContainer",
        )?;
        enc_check(
            unsafe { jxl::JxlEncoderStoreJPEGMetadata(enc.0, jxl::JxlBool::True) },
            "JxlEncoderStoreJPEGMetadata",
        )?;

        let settings = unsafe { jxl::JxlEncoderFrameSettingsCreate(enc.0, ptr::null()) };
        unsafe {
            jxl::JxlEncoderFrameSettingsSetOption(
                settings,
                jxl::JxlEncoderFrameSettingId::Effort,
                effort.clamp(1, 10) as i64,
            );
        }

        if unsafe { jxl::JxlEncoderAddJPEGFrame(settings, data.as_ptr(), data.len()) }
            != jxl::JxlEncoderStatus::Success
        {
            return Err(Error::CorruptStream(
                "JxlEncoderAddJPEGFrame failed (input may not be a valid JPEG)".into(),
            ));
        }
        unsafe { jxl::JxlEncoderCloseInput(enc.0) };

        process_output(&enc, data.len() + 4096)
    }

    fn jxl_to_jpeg(&self, data: &[u8]) -> Result<Vec<u8>> {
        let dec = DecoderGuard::create()?;

        let events = jxl::JxlDecoderStatus::JpegReconstruction as c_int
            | jxl::JxlDecoderStatus::FullImage as c_int;
        if unsafe { jxl::JxlDecoderSubscribeEvents(dec.0, events) } != jxl::JxlDecoderStatus::Success
        {
            return Err(Error::Engine("JxlDecoderSubscribeEvents failed".into()));
        }

        unsafe {
            jxl::JxlDecoderSetInput(dec.0, data.as_ptr(), data.len());
            jxl::JxlDecoderCloseInput(dec.0);
        }

        let mut jpeg = vec![0u8; 4096];
        let mut jpeg_pos = 0usize;
        let mut reconstruction_seen = false;

        loop {
            let status = unsafe { jxl::JxlDecoderProcessInput(dec.0) };
            match status {
                jxl::JxlDecoderStatus::Error => {
                    return Err(Error::CorruptStream(
                        "decoder error during JPEG reconstruction".into(),
                    ));
                }
                jxl::JxlDecoderStatus::JpegReconstruction => {
                    reconstruction_seen = true;
                    if unsafe {
                        jxl::JxlDecoderSetJPEGBuffer(dec.0, jpeg.as_mut_ptr(), jpeg.len())
                    } != jxl::JxlDecoderStatus::Success
                    {
                        return Err(Error::Engine("JxlDecoderSetJPEGBuffer failed".into()));
                    }
                }
                jxl::JxlDecoderStatus::JpegNeedMoreOutput => {
                    let remaining = unsafe { jxl::JxlDecoderReleaseJPEGBuffer(dec.0) };
                    jpeg_pos = jpeg.len() - remaining;
                    jpeg.resize(jpeg.len() * 2, 0);
                    if unsafe {
                        jxl::JxlDecoderSetJPEGBuffer(
                            dec.0,
                            jpeg.as_mut_ptr().add(jpeg_pos),
                            jpeg.len() - jpeg_pos,
                        )
                    } != jxl::JxlDecoderStatus::Success
                    {
                        return Err(Error::Engine(
                            "JxlDecoderSetJPEGBuffer failed after resize".into(),
                        ));
                    }
                }
                jxl::JxlDecoderStatus::FullImage => {}
                jxl::JxlDecoderStatus::Success => {
                    if reconstruction_seen {
                        let remaining = unsafe { jxl::JxlDecoderReleaseJPEGBuffer(dec.0) };
                        jpeg_pos = jpeg.len() - remaining;
                    }
                    break;
                }
                // Any other event (e.g. a pixels-only stream asking for an
                // image buffer) means there is nothing to reconstruct.
                _ => break,
            }
        }

        if !reconstruction_seen {
            return Err(Error::NotReconstructible);
        }

        jpeg.truncate(jpeg_pos);
        Ok(jpeg)
    }

    fn version(&self) -> Version {
        runtime_version()
    }
}
