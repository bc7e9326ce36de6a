//! Shared test support: a deterministic substitute engine and buffer
//! generators.
//!
//! `MockEngine` serializes pixels, resolved parameters, and metadata into
//! tagged containers (prefixed with the real JXL/JPEG signature bytes), so
//! the facade's lifecycle, configuration resolution, dispatch, and error
//! propagation can be exercised without a native codec. Two encodes with
//! the same inputs and resolved parameters produce identical bytes, which
//! is what the override-precedence tests rely on.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jxlx::engine::{CodecEngine, Decoded};
use jxlx::{CodecConfig, EncodeParams, Error, JxlCodec, Metadata, PixelBuffer, Result, Version};

const JXL_SIG: [u8; 2] = [0xFF, 0x0A];
const JPEG_SIG: [u8; 2] = [0xFF, 0xD8];
const PIXELS_TAG: [u8; 2] = *b"PX";
const JPEG_EMBED_TAG: [u8; 2] = *b"JP";
const MOCK_JPEG_TAG: [u8; 2] = *b"MK";

pub struct MockEngine {
    calls: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of primitive operations invoked on this engine.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(Error::CorruptStream("truncated mock container".into()));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let raw = self.bytes(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn done(&self) -> bool {
        self.pos == self.data.len()
    }
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_block(out: &mut Vec<u8>, tag: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(tag);
    push_u32(out, payload.len() as u32);
    out.extend_from_slice(payload);
}

impl CodecEngine for MockEngine {
    fn encode(
        &self,
        image: &PixelBuffer,
        params: &EncodeParams,
        metadata: &Metadata,
    ) -> Result<Vec<u8>> {
        self.record();
        if image.channels() != 3 && image.channels() != 4 {
            return Err(Error::InvalidInput(format!(
                "expected 3 or 4 channels, got {}",
                image.channels()
            )));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&JXL_SIG);
        out.extend_from_slice(&PIXELS_TAG);
        push_u32(&mut out, image.width());
        push_u32(&mut out, image.height());
        out.push(image.channels());
        out.push(u8::from(params.lossless));
        push_u32(&mut out, params.effort);
        push_u32(&mut out, params.distance.to_bits());
        push_u32(&mut out, params.decoding_speed);
        push_u32(&mut out, image.as_bytes().len() as u32);
        out.extend_from_slice(image.as_bytes());
        if let Some(exif) = &metadata.exif {
            push_block(&mut out, b"Exif", exif);
        }
        if let Some(xmp) = &metadata.xmp {
            push_block(&mut out, b"xml ", xmp);
        }
        if let Some(jumbf) = &metadata.jumbf {
            push_block(&mut out, b"jumb", jumbf);
        }
        Ok(out)
    }

    fn decode(&self, data: &[u8], with_metadata: bool) -> Result<Decoded> {
        self.record();
        let mut r = Reader::new(data);
        if r.bytes(2)? != JXL_SIG {
            return Err(Error::CorruptStream("not a JXL stream".into()));
        }
        match r.bytes(2)? {
            tag if tag == PIXELS_TAG => {}
            tag if tag == JPEG_EMBED_TAG => {
                // A transcoded stream still decodes to pixels.
                let len = r.u32()? as usize;
                let jpeg = r.bytes(len)?;
                let pixels = self.decode_jpeg(jpeg)?;
                return Ok(Decoded {
                    pixels,
                    metadata: with_metadata.then(Metadata::default),
                });
            }
            _ => return Err(Error::CorruptStream("unknown mock container".into())),
        }

        let width = r.u32()?;
        let height = r.u32()?;
        let channels = r.u8()?;
        let _lossless = r.u8()?;
        let _effort = r.u32()?;
        let _distance = r.u32()?;
        let _speed = r.u32()?;
        let len = r.u32()? as usize;
        let pixels = PixelBuffer::new(width, height, channels, r.bytes(len)?.to_vec())?;

        let mut metadata = Metadata::default();
        while !r.done() {
            let tag: [u8; 4] = r.bytes(4)?.try_into().expect("4-byte tag");
            let len = r.u32()? as usize;
            let payload = r.bytes(len)?.to_vec();
            match &tag {
                b"Exif" => metadata.exif = Some(payload),
                b"xml " => metadata.xmp = Some(payload),
                b"jumb" => metadata.jumbf = Some(payload),
                _ => return Err(Error::CorruptStream("unknown mock box".into())),
            }
        }

        Ok(Decoded {
            pixels,
            metadata: with_metadata.then_some(metadata),
        })
    }

    fn encode_jpeg(&self, image: &PixelBuffer, quality: u8) -> Result<Vec<u8>> {
        self.record();
        if image.channels() != 3 && image.channels() != 4 {
            return Err(Error::InvalidInput(format!(
                "expected 3 or 4 channels, got {}",
                image.channels()
            )));
        }

        // JPEG has no alpha; drop the 4th channel.
        let rgb: Vec<u8> = if image.channels() == 4 {
            image
                .as_bytes()
                .chunks_exact(4)
                .flat_map(|px| px[..3].to_vec())
                .collect()
        } else {
            image.as_bytes().to_vec()
        };

        let mut out = Vec::new();
        out.extend_from_slice(&JPEG_SIG);
        out.extend_from_slice(&MOCK_JPEG_TAG);
        out.push(quality);
        push_u32(&mut out, image.width());
        push_u32(&mut out, image.height());
        push_u32(&mut out, rgb.len() as u32);
        out.extend_from_slice(&rgb);
        Ok(out)
    }

    fn decode_jpeg(&self, data: &[u8]) -> Result<PixelBuffer> {
        self.record();
        let mut r = Reader::new(data);
        if r.bytes(2)? != JPEG_SIG || r.bytes(2)? != MOCK_JPEG_TAG {
            return Err(Error::CorruptStream("not a JPEG stream".into()));
        }
        let _quality = r.u8()?;
        let width = r.u32()?;
        let height = r.u32()?;
        let len = r.u32()? as usize;
        PixelBuffer::new(width, height, 3, r.bytes(len)?.to_vec())
    }

    fn jpeg_to_jxl(&self, data: &[u8], _effort: u32) -> Result<Vec<u8>> {
        self.record();
        if !data.starts_with(&JPEG_SIG) {
            return Err(Error::CorruptStream("input is not a valid JPEG".into()));
        }
        let mut out = Vec::new();
        out.extend_from_slice(&JXL_SIG);
        out.extend_from_slice(&JPEG_EMBED_TAG);
        push_u32(&mut out, data.len() as u32);
        out.extend_from_slice(data);
        Ok(out)
    }

    fn jxl_to_jpeg(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.record();
        let mut r = Reader::new(data);
        if r.bytes(2)? != JXL_SIG {
            return Err(Error::CorruptStream("not a JXL stream".into()));
        }
        match r.bytes(2)? {
            tag if tag == JPEG_EMBED_TAG => {
                let len = r.u32()? as usize;
                Ok(r.bytes(len)?.to_vec())
            }
            tag if tag == PIXELS_TAG => Err(Error::NotReconstructible),
            _ => Err(Error::CorruptStream("unknown mock container".into())),
        }
    }

    fn version(&self) -> Version {
        Version {
            major: 0,
            minor: 1,
            patch: 0,
        }
    }
}

/// A handle over a fresh mock engine; also returns the engine for call
/// counting.
pub fn mock_codec(config: CodecConfig) -> (JxlCodec, Arc<MockEngine>) {
    let engine = Arc::new(MockEngine::new());
    let codec = JxlCodec::with_engine(engine.clone(), config).expect("handle should open");
    (codec, engine)
}

/// Deterministic gradient image.
pub fn gradient(width: u32, height: u32, channels: u8) -> PixelBuffer {
    let mut data = Vec::with_capacity((width * height * u32::from(channels)) as usize);
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                data.push(((x * 3 + y * 7 + u32::from(c) * 11) % 256) as u8);
            }
        }
    }
    PixelBuffer::new(width, height, channels, data).expect("gradient dimensions are consistent")
}

/// Pseudo-random image from a tiny LCG; deterministic per seed.
pub fn noise(width: u32, height: u32, channels: u8, seed: u32) -> PixelBuffer {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    let mut data = Vec::with_capacity((width * height * u32::from(channels)) as usize);
    for _ in 0..width * height * u32::from(channels) {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        data.push((state >> 24) as u8);
    }
    PixelBuffer::new(width, height, channels, data).expect("noise dimensions are consistent")
}

/// Per-test scratch directory under the system temp dir, removed first if
/// a previous run left it behind.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("jxlx-test-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
