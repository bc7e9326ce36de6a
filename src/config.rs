//! Instance configuration, per-call overrides, and their resolution.

use crate::types::Metadata;

/// Default encoding effort.
pub const DEFAULT_EFFORT: u32 = 7;
/// Default perceptual distance.
pub const DEFAULT_DISTANCE: f32 = 1.0;
/// Default decoding-speed tier.
pub const DEFAULT_DECODING_SPEED: u32 = 0;
/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

fn clamp_effort(effort: u32) -> u32 {
    effort.clamp(1, 10)
}

fn clamp_distance(distance: f32) -> f32 {
    distance.clamp(0.0, 25.0)
}

fn clamp_decoding_speed(speed: u32) -> u32 {
    speed.min(4)
}

/// Instance-level codec defaults, captured at handle construction.
///
/// Builder-style; every setter clamps to the engine's accepted range.
///
/// # Example
///
/// ```rust
/// use jxlx::CodecConfig;
///
/// let config = CodecConfig::new()
///     .effort(9)
///     .distance(0.5)
///     .threads(4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecConfig {
    pub(crate) effort: u32,
    pub(crate) distance: f32,
    pub(crate) lossless: bool,
    pub(crate) decoding_speed: u32,
    pub(crate) threads: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            effort: DEFAULT_EFFORT,
            distance: DEFAULT_DISTANCE,
            lossless: false,
            decoding_speed: DEFAULT_DECODING_SPEED,
            threads: 0,
        }
    }
}

impl CodecConfig {
    /// Create a configuration with default settings.
    ///
    /// Default: effort 7, distance 1.0, lossy, decoding-speed tier 0,
    /// auto-sized worker pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set encoding effort (1 = fastest, 10 = slowest and smallest).
    #[must_use]
    pub fn effort(mut self, effort: u32) -> Self {
        self.effort = clamp_effort(effort);
        self
    }

    /// Set perceptual distance (0.0 = mathematically lossless, max 25.0).
    #[must_use]
    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = clamp_distance(distance);
        self
    }

    /// Enable lossless encoding. When set, distance is ignored.
    #[must_use]
    pub fn lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }

    /// Set the decoding-speed tier (0 = best quality, 4 = fastest decode).
    #[must_use]
    pub fn decoding_speed(mut self, speed: u32) -> Self {
        self.decoding_speed = clamp_decoding_speed(speed);
        self
    }

    /// Set the worker pool size for non-blocking dispatch.
    ///
    /// `0` auto-detects a sane default (one worker per logical CPU).
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Merge per-call overrides over these defaults.
    ///
    /// Each provided override wins; each absent field falls back to the
    /// instance value. `self` is never mutated, and an explicit zero is an
    /// override like any other, never "absent".
    #[must_use]
    pub fn resolve(&self, options: &EncodeOptions) -> EncodeParams {
        let lossless = options.lossless.unwrap_or(self.lossless);
        let distance = if lossless {
            0.0
        } else {
            clamp_distance(options.distance.unwrap_or(self.distance))
        };
        EncodeParams {
            effort: clamp_effort(options.effort.unwrap_or(self.effort)),
            distance,
            lossless,
            decoding_speed: clamp_decoding_speed(
                options.decoding_speed.unwrap_or(self.decoding_speed),
            ),
        }
    }
}

/// Per-call encode overrides and metadata payloads.
///
/// Every knob is optional: unset fields fall back to the instance (or
/// crate) defaults at resolution time.
///
/// # Example
///
/// ```rust
/// use jxlx::EncodeOptions;
///
/// let options = EncodeOptions::new()
///     .lossless(true)
///     .exif(vec![0x4D, 0x4D, 0x00, 0x2A]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeOptions {
    pub(crate) effort: Option<u32>,
    pub(crate) distance: Option<f32>,
    pub(crate) lossless: Option<bool>,
    pub(crate) decoding_speed: Option<u32>,
    pub(crate) metadata: Metadata,
}

impl EncodeOptions {
    /// Create an empty override set (all fields fall back to defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override encoding effort for this call.
    #[must_use]
    pub fn effort(mut self, effort: u32) -> Self {
        self.effort = Some(effort);
        self
    }

    /// Override perceptual distance for this call.
    #[must_use]
    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Override lossless mode for this call.
    #[must_use]
    pub fn lossless(mut self, lossless: bool) -> Self {
        self.lossless = Some(lossless);
        self
    }

    /// Override the decoding-speed tier for this call.
    #[must_use]
    pub fn decoding_speed(mut self, speed: u32) -> Self {
        self.decoding_speed = Some(speed);
        self
    }

    /// Attach an EXIF payload to embed in the output stream.
    #[must_use]
    pub fn exif(mut self, exif: impl Into<Vec<u8>>) -> Self {
        self.metadata.exif = Some(exif.into());
        self
    }

    /// Attach an XMP payload to embed in the output stream.
    #[must_use]
    pub fn xmp(mut self, xmp: impl Into<Vec<u8>>) -> Self {
        self.metadata.xmp = Some(xmp.into());
        self
    }

    /// Attach a JUMBF payload to embed in the output stream.
    #[must_use]
    pub fn jumbf(mut self, jumbf: impl Into<Vec<u8>>) -> Self {
        self.metadata.jumbf = Some(jumbf.into());
        self
    }

    /// The metadata payloads attached to this call.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// A fully resolved encode parameter set, as handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    /// Encoding effort, 1..=10.
    pub effort: u32,
    /// Perceptual distance, 0.0..=25.0; always 0.0 when lossless.
    pub distance: f32,
    /// Lossless mode.
    pub lossless: bool,
    /// Decoding-speed tier, 0..=4.
    pub decoding_speed: u32,
}
