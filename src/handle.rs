//! The stateful codec handle: lifecycle, synchronous facade, and the
//! non-blocking dispatch layer.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{CodecConfig, EncodeOptions};
use crate::engine::CodecEngine;
use crate::error::{Error, Result};
use crate::io::{read_existing, write_with_parents};
use crate::pool::{self, WorkerPool};
use crate::types::{Metadata, PixelBuffer, Version};

/// A unified JXL/JPEG codec handle.
///
/// Owns a bounded worker pool (sized by [`CodecConfig::threads`], `0` =
/// auto) and the instance encode defaults. Every operation exists in a
/// blocking form, which runs the engine on the calling thread, and an
/// `*_async` form, which dispatches it to the handle's pool and resolves
/// to the identical result. Concurrently dispatched operations may
/// complete in any order; each future delivers its own call's result.
///
/// # Lifecycle
///
/// The handle is open from construction until [`JxlCodec::close`], which
/// is idempotent: the first call refuses further operations, then releases
/// the pool after in-flight pooled work finishes. Dropping the handle
/// closes it, so scope exit — normal, early return, or panic unwind —
/// always releases the pool. Operations on a closed handle fail with
/// [`Error::Closed`] before reaching the engine.
///
/// # Example
///
/// With the `libjxl` feature enabled:
///
/// ```rust,no_run
/// # #[cfg(feature = "libjxl")] {
/// use jxlx::{CodecConfig, EncodeOptions, JxlCodec, PixelBuffer};
///
/// let codec = JxlCodec::new(CodecConfig::new().effort(7).threads(4))?;
/// let image = PixelBuffer::new(64, 64, 3, vec![0u8; 64 * 64 * 3])?;
/// codec.write("out/image.jxl", &image, &EncodeOptions::new())?;
/// let back = codec.read("out/image.jxl")?;
/// assert_eq!(back.shape(), image.shape());
/// codec.close();
/// # }
/// # Ok::<(), jxlx::Error>(())
/// ```
pub struct JxlCodec {
    engine: Arc<dyn CodecEngine>,
    config: CodecConfig,
    pool: Mutex<Option<WorkerPool>>,
    closed: AtomicBool,
}

#[cfg(feature = "libjxl")]
impl JxlCodec {
    /// Create a handle backed by the native engine (libjxl +
    /// libjpeg-turbo).
    pub fn new(config: CodecConfig) -> Result<Self> {
        Self::with_engine(Arc::new(crate::engine::LibjxlEngine::new()), config)
    }
}

impl JxlCodec {
    /// Create a handle backed by an arbitrary engine.
    ///
    /// This is the seam for alternate bindings and for exercising the
    /// facade against a substitute engine in tests.
    pub fn with_engine(engine: Arc<dyn CodecEngine>, config: CodecConfig) -> Result<Self> {
        let pool = WorkerPool::new(config.threads)?;
        Ok(Self {
            engine,
            config,
            pool: Mutex::new(Some(pool)),
            closed: AtomicBool::new(false),
        })
    }

    /// The instance defaults captured at construction.
    #[must_use]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Engine library version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.engine.version()
    }

    /// Whether [`JxlCodec::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the handle and release the worker pool.
    ///
    /// Idempotent. New operations are refused immediately; pooled work
    /// already dispatched runs to completion before the pool's threads are
    /// joined. Safe to call while operations are in flight.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let pool = self.pool_guard().take();
        // Dropping the pool outside the lock lets in-flight jobs finish
        // without holding dispatchers on the mutex.
        drop(pool);
        tracing::debug!("codec handle closed");
    }

    fn pool_guard(&self) -> MutexGuard<'_, Option<WorkerPool>> {
        match self.pool.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn dispatch<T, F>(&self, job: F) -> Result<futures::channel::oneshot::Receiver<Result<T>>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        self.ensure_open()?;
        match self.pool_guard().as_ref() {
            Some(pool) => Ok(pool.dispatch(job)),
            None => Err(Error::Closed),
        }
    }

    // --- JXL ---

    /// Encode pixels to a JXL codestream.
    ///
    /// Per-call overrides in `options` win over the instance defaults;
    /// unset fields fall back. Metadata payloads in `options` are embedded
    /// in the stream.
    pub fn encode(&self, image: &PixelBuffer, options: &EncodeOptions) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let params = self.config.resolve(options);
        self.engine.encode(image, &params, options.metadata())
    }

    /// Decode a JXL codestream to pixels.
    pub fn decode(&self, data: &[u8]) -> Result<PixelBuffer> {
        self.ensure_open()?;
        Ok(self.engine.decode(data, false)?.pixels)
    }

    /// Decode a JXL codestream to pixels plus extracted metadata.
    ///
    /// The metadata map contains exactly the keys present in the stream;
    /// a stream without metadata yields an empty map.
    pub fn decode_with_metadata(&self, data: &[u8]) -> Result<(PixelBuffer, Metadata)> {
        self.ensure_open()?;
        let decoded = self.engine.decode(data, true)?;
        Ok((decoded.pixels, decoded.metadata.unwrap_or_default()))
    }

    // --- JPEG ---

    /// Encode pixels to a JPEG stream. A 4th (alpha) channel is dropped.
    pub fn encode_jpeg(&self, image: &PixelBuffer, quality: u8) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.engine.encode_jpeg(image, quality)
    }

    /// Decode a JPEG stream to RGB pixels.
    pub fn decode_jpeg(&self, data: &[u8]) -> Result<PixelBuffer> {
        self.ensure_open()?;
        self.engine.decode_jpeg(data)
    }

    // --- Cross-format transcoding ---

    /// Losslessly recompress a JPEG stream into a JXL codestream.
    ///
    /// The original JPEG is embedded bit-for-bit and can be recovered via
    /// [`JxlCodec::jxl_to_jpeg`]. `effort` falls back to the instance
    /// default when `None`.
    pub fn jpeg_to_jxl(&self, data: &[u8], effort: Option<u32>) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.engine
            .jpeg_to_jxl(data, effort.unwrap_or(self.config.effort))
    }

    /// Reconstruct the original JPEG bytes from a transcoded JXL stream.
    ///
    /// Fails with [`Error::NotReconstructible`] when the stream was
    /// encoded from raw pixels rather than via [`JxlCodec::jpeg_to_jxl`].
    pub fn jxl_to_jpeg(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.engine.jxl_to_jpeg(data)
    }

    // --- File I/O ---

    /// Read and decode a JXL file.
    ///
    /// Fails with [`Error::NotFound`] before any engine work when the
    /// path does not exist.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<PixelBuffer> {
        self.ensure_open()?;
        let data = read_existing(path.as_ref())?;
        Ok(self.engine.decode(&data, false)?.pixels)
    }

    /// Read and decode a JXL file, extracting metadata.
    pub fn read_with_metadata(&self, path: impl AsRef<Path>) -> Result<(PixelBuffer, Metadata)> {
        self.ensure_open()?;
        let data = read_existing(path.as_ref())?;
        let decoded = self.engine.decode(&data, true)?;
        Ok((decoded.pixels, decoded.metadata.unwrap_or_default()))
    }

    /// Encode pixels and write them to a JXL file.
    ///
    /// Missing ancestor directories are created; an existing file is
    /// overwritten. The file is written only after a successful encode.
    pub fn write(
        &self,
        path: impl AsRef<Path>,
        image: &PixelBuffer,
        options: &EncodeOptions,
    ) -> Result<()> {
        self.ensure_open()?;
        let params = self.config.resolve(options);
        let data = self.engine.encode(image, &params, options.metadata())?;
        write_with_parents(path.as_ref(), &data)
    }

    /// Read and decode a JPEG file.
    pub fn read_jpeg(&self, path: impl AsRef<Path>) -> Result<PixelBuffer> {
        self.ensure_open()?;
        let data = read_existing(path.as_ref())?;
        self.engine.decode_jpeg(&data)
    }

    /// Encode pixels and write them to a JPEG file.
    pub fn write_jpeg(
        &self,
        path: impl AsRef<Path>,
        image: &PixelBuffer,
        quality: u8,
    ) -> Result<()> {
        self.ensure_open()?;
        let data = self.engine.encode_jpeg(image, quality)?;
        write_with_parents(path.as_ref(), &data)
    }

    /// Losslessly transcode a JPEG file to a JXL file.
    pub fn convert_jpeg_to_jxl(
        &self,
        jpeg_path: impl AsRef<Path>,
        jxl_path: impl AsRef<Path>,
        effort: Option<u32>,
    ) -> Result<()> {
        self.ensure_open()?;
        let jpeg = read_existing(jpeg_path.as_ref())?;
        let jxl = self
            .engine
            .jpeg_to_jxl(&jpeg, effort.unwrap_or(self.config.effort))?;
        write_with_parents(jxl_path.as_ref(), &jxl)
    }

    /// Reconstruct a JPEG file from a transcoded JXL file.
    pub fn convert_jxl_to_jpeg(
        &self,
        jxl_path: impl AsRef<Path>,
        jpeg_path: impl AsRef<Path>,
    ) -> Result<()> {
        self.ensure_open()?;
        let jxl = read_existing(jxl_path.as_ref())?;
        let jpeg = self.engine.jxl_to_jpeg(&jxl)?;
        write_with_parents(jpeg_path.as_ref(), &jpeg)
    }

    // --- Non-blocking forms ---
    //
    // Each resolves to exactly what its blocking form returns. Inputs are
    // cloned into the job; the engine never borrows past the call.

    /// Non-blocking [`JxlCodec::encode`].
    pub async fn encode_async(
        &self,
        image: &PixelBuffer,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>> {
        let params = self.config.resolve(options);
        let metadata = options.metadata().clone();
        let image = image.clone();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || engine.encode(&image, &params, &metadata))?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::decode`].
    pub async fn decode_async(&self, data: &[u8]) -> Result<PixelBuffer> {
        let data = data.to_vec();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || Ok(engine.decode(&data, false)?.pixels))?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::decode_with_metadata`].
    pub async fn decode_with_metadata_async(
        &self,
        data: &[u8],
    ) -> Result<(PixelBuffer, Metadata)> {
        let data = data.to_vec();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || {
            let decoded = engine.decode(&data, true)?;
            Ok((decoded.pixels, decoded.metadata.unwrap_or_default()))
        })?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::encode_jpeg`].
    pub async fn encode_jpeg_async(&self, image: &PixelBuffer, quality: u8) -> Result<Vec<u8>> {
        let image = image.clone();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || engine.encode_jpeg(&image, quality))?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::decode_jpeg`].
    pub async fn decode_jpeg_async(&self, data: &[u8]) -> Result<PixelBuffer> {
        let data = data.to_vec();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || engine.decode_jpeg(&data))?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::jpeg_to_jxl`].
    pub async fn jpeg_to_jxl_async(&self, data: &[u8], effort: Option<u32>) -> Result<Vec<u8>> {
        let data = data.to_vec();
        let effort = effort.unwrap_or(self.config.effort);
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || engine.jpeg_to_jxl(&data, effort))?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::jxl_to_jpeg`].
    pub async fn jxl_to_jpeg_async(&self, data: &[u8]) -> Result<Vec<u8>> {
        let data = data.to_vec();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || engine.jxl_to_jpeg(&data))?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::read`]; filesystem work runs on the pool.
    pub async fn read_async(&self, path: impl AsRef<Path>) -> Result<PixelBuffer> {
        let path = path.as_ref().to_owned();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || {
            let data = read_existing(&path)?;
            Ok(engine.decode(&data, false)?.pixels)
        })?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::read_with_metadata`].
    pub async fn read_with_metadata_async(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(PixelBuffer, Metadata)> {
        let path = path.as_ref().to_owned();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || {
            let data = read_existing(&path)?;
            let decoded = engine.decode(&data, true)?;
            Ok((decoded.pixels, decoded.metadata.unwrap_or_default()))
        })?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::write`]; filesystem work runs on the pool.
    pub async fn write_async(
        &self,
        path: impl AsRef<Path>,
        image: &PixelBuffer,
        options: &EncodeOptions,
    ) -> Result<()> {
        let path = path.as_ref().to_owned();
        let params = self.config.resolve(options);
        let metadata = options.metadata().clone();
        let image = image.clone();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || {
            let data = engine.encode(&image, &params, &metadata)?;
            write_with_parents(&path, &data)
        })?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::read_jpeg`].
    pub async fn read_jpeg_async(&self, path: impl AsRef<Path>) -> Result<PixelBuffer> {
        let path = path.as_ref().to_owned();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || {
            let data = read_existing(&path)?;
            engine.decode_jpeg(&data)
        })?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::write_jpeg`].
    pub async fn write_jpeg_async(
        &self,
        path: impl AsRef<Path>,
        image: &PixelBuffer,
        quality: u8,
    ) -> Result<()> {
        let path = path.as_ref().to_owned();
        let image = image.clone();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || {
            let data = engine.encode_jpeg(&image, quality)?;
            write_with_parents(&path, &data)
        })?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::convert_jpeg_to_jxl`].
    pub async fn convert_jpeg_to_jxl_async(
        &self,
        jpeg_path: impl AsRef<Path>,
        jxl_path: impl AsRef<Path>,
        effort: Option<u32>,
    ) -> Result<()> {
        let jpeg_path = jpeg_path.as_ref().to_owned();
        let jxl_path = jxl_path.as_ref().to_owned();
        let effort = effort.unwrap_or(self.config.effort);
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || {
            let jpeg = read_existing(&jpeg_path)?;
            let jxl = engine.jpeg_to_jxl(&jpeg, effort)?;
            write_with_parents(&jxl_path, &jxl)
        })?;
        pool::resolve(rx).await
    }

    /// Non-blocking [`JxlCodec::convert_jxl_to_jpeg`].
    pub async fn convert_jxl_to_jpeg_async(
        &self,
        jxl_path: impl AsRef<Path>,
        jpeg_path: impl AsRef<Path>,
    ) -> Result<()> {
        let jxl_path = jxl_path.as_ref().to_owned();
        let jpeg_path = jpeg_path.as_ref().to_owned();
        let engine = Arc::clone(&self.engine);
        let rx = self.dispatch(move || {
            let jxl = read_existing(&jxl_path)?;
            let jpeg = engine.jxl_to_jpeg(&jxl)?;
            write_with_parents(&jpeg_path, &jpeg)
        })?;
        pool::resolve(rx).await
    }
}

impl Drop for JxlCodec {
    fn drop(&mut self) {
        self.close();
    }
}

impl core::fmt::Debug for JxlCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JxlCodec")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
