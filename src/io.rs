//! File I/O adapter: path-checked reads, ancestor-creating writes, and the
//! file-level free functions.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Load a file's bytes, failing with [`Error::NotFound`] before any other
/// work when the path does not exist.
pub(crate) fn read_existing(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_owned()));
    }
    Ok(fs::read(path)?)
}

/// Persist `data` at `path`, creating missing ancestor directories and
/// overwriting any existing file.
pub(crate) fn write_with_parents(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, data)?;
    tracing::trace!(path = %path.display(), bytes = data.len(), "wrote codestream");
    Ok(())
}

#[cfg(feature = "libjxl")]
mod free {
    use std::path::Path;

    use super::{read_existing, write_with_parents};
    use crate::config::{CodecConfig, EncodeOptions, DEFAULT_EFFORT};
    use crate::engine::{CodecEngine, LibjxlEngine};
    use crate::error::Result;
    use crate::pool;
    use crate::types::{Metadata, PixelBuffer};

    /// Read and decode a JXL file with the native engine.
    ///
    /// Fails with [`crate::Error::NotFound`] when the path does not exist.
    pub fn read(path: impl AsRef<Path>) -> Result<PixelBuffer> {
        let data = read_existing(path.as_ref())?;
        Ok(LibjxlEngine::new().decode(&data, false)?.pixels)
    }

    /// Read and decode a JXL file, extracting metadata.
    pub fn read_with_metadata(path: impl AsRef<Path>) -> Result<(PixelBuffer, Metadata)> {
        let data = read_existing(path.as_ref())?;
        let decoded = LibjxlEngine::new().decode(&data, true)?;
        Ok((decoded.pixels, decoded.metadata.unwrap_or_default()))
    }

    /// Encode pixels and write them to a JXL file.
    ///
    /// Missing ancestor directories are created; the file is written only
    /// after a successful encode.
    pub fn write(
        path: impl AsRef<Path>,
        image: &PixelBuffer,
        options: &EncodeOptions,
    ) -> Result<()> {
        let params = CodecConfig::default().resolve(options);
        let data = LibjxlEngine::new().encode(image, &params, options.metadata())?;
        write_with_parents(path.as_ref(), &data)
    }

    /// Read and decode a JPEG file.
    pub fn read_jpeg(path: impl AsRef<Path>) -> Result<PixelBuffer> {
        let data = read_existing(path.as_ref())?;
        LibjxlEngine::new().decode_jpeg(&data)
    }

    /// Encode pixels and write them to a JPEG file.
    ///
    /// Pass [`crate::DEFAULT_JPEG_QUALITY`] for the conventional setting.
    pub fn write_jpeg(path: impl AsRef<Path>, image: &PixelBuffer, quality: u8) -> Result<()> {
        let data = LibjxlEngine::new().encode_jpeg(image, quality)?;
        write_with_parents(path.as_ref(), &data)
    }

    /// Losslessly transcode a JPEG file to a JXL file.
    ///
    /// The JPEG reconstruction data is preserved, so the original file can
    /// be restored with [`convert_jxl_to_jpeg`].
    pub fn convert_jpeg_to_jxl(
        jpeg_path: impl AsRef<Path>,
        jxl_path: impl AsRef<Path>,
        effort: Option<u32>,
    ) -> Result<()> {
        let jpeg = read_existing(jpeg_path.as_ref())?;
        let jxl = LibjxlEngine::new().jpeg_to_jxl(&jpeg, effort.unwrap_or(DEFAULT_EFFORT))?;
        write_with_parents(jxl_path.as_ref(), &jxl)
    }

    /// Reconstruct a JPEG file from a transcoded JXL file.
    pub fn convert_jxl_to_jpeg(
        jxl_path: impl AsRef<Path>,
        jpeg_path: impl AsRef<Path>,
    ) -> Result<()> {
        let jxl = read_existing(jxl_path.as_ref())?;
        let jpeg = LibjxlEngine::new().jxl_to_jpeg(&jxl)?;
        write_with_parents(jpeg_path.as_ref(), &jpeg)
    }

    /// Non-blocking [`read`], on the shared pool.
    pub async fn read_async(path: impl AsRef<Path>) -> Result<PixelBuffer> {
        let path = path.as_ref().to_owned();
        let rx = pool::shared()?.dispatch(move || {
            let data = read_existing(&path)?;
            Ok(LibjxlEngine::new().decode(&data, false)?.pixels)
        });
        pool::resolve(rx).await
    }

    /// Non-blocking [`read_with_metadata`], on the shared pool.
    pub async fn read_with_metadata_async(
        path: impl AsRef<Path>,
    ) -> Result<(PixelBuffer, Metadata)> {
        let path = path.as_ref().to_owned();
        let rx = pool::shared()?.dispatch(move || {
            let data = read_existing(&path)?;
            let decoded = LibjxlEngine::new().decode(&data, true)?;
            Ok((decoded.pixels, decoded.metadata.unwrap_or_default()))
        });
        pool::resolve(rx).await
    }

    /// Non-blocking [`write`], on the shared pool.
    pub async fn write_async(
        path: impl AsRef<Path>,
        image: &PixelBuffer,
        options: &EncodeOptions,
    ) -> Result<()> {
        let path = path.as_ref().to_owned();
        let params = CodecConfig::default().resolve(options);
        let metadata = options.metadata().clone();
        let image = image.clone();
        let rx = pool::shared()?.dispatch(move || {
            let data = LibjxlEngine::new().encode(&image, &params, &metadata)?;
            write_with_parents(&path, &data)
        });
        pool::resolve(rx).await
    }

    /// Non-blocking [`read_jpeg`], on the shared pool.
    pub async fn read_jpeg_async(path: impl AsRef<Path>) -> Result<PixelBuffer> {
        let path = path.as_ref().to_owned();
        let rx = pool::shared()?.dispatch(move || {
            let data = read_existing(&path)?;
            LibjxlEngine::new().decode_jpeg(&data)
        });
        pool::resolve(rx).await
    }

    /// Non-blocking [`write_jpeg`], on the shared pool.
    pub async fn write_jpeg_async(
        path: impl AsRef<Path>,
        image: &PixelBuffer,
        quality: u8,
    ) -> Result<()> {
        let path = path.as_ref().to_owned();
        let image = image.clone();
        let rx = pool::shared()?.dispatch(move || {
            let data = LibjxlEngine::new().encode_jpeg(&image, quality)?;
            write_with_parents(&path, &data)
        });
        pool::resolve(rx).await
    }

    /// Non-blocking [`convert_jpeg_to_jxl`], on the shared pool.
    pub async fn convert_jpeg_to_jxl_async(
        jpeg_path: impl AsRef<Path>,
        jxl_path: impl AsRef<Path>,
        effort: Option<u32>,
    ) -> Result<()> {
        let jpeg_path = jpeg_path.as_ref().to_owned();
        let jxl_path = jxl_path.as_ref().to_owned();
        let effort = effort.unwrap_or(DEFAULT_EFFORT);
        let rx = pool::shared()?.dispatch(move || {
            let jpeg = read_existing(&jpeg_path)?;
            let jxl = LibjxlEngine::new().jpeg_to_jxl(&jpeg, effort)?;
            write_with_parents(&jxl_path, &jxl)
        });
        pool::resolve(rx).await
    }

    /// Non-blocking [`convert_jxl_to_jpeg`], on the shared pool.
    pub async fn convert_jxl_to_jpeg_async(
        jxl_path: impl AsRef<Path>,
        jpeg_path: impl AsRef<Path>,
    ) -> Result<()> {
        let jxl_path = jxl_path.as_ref().to_owned();
        let jpeg_path = jpeg_path.as_ref().to_owned();
        let rx = pool::shared()?.dispatch(move || {
            let jxl = read_existing(&jxl_path)?;
            let jpeg = LibjxlEngine::new().jxl_to_jpeg(&jxl)?;
            write_with_parents(&jpeg_path, &jpeg)
        });
        pool::resolve(rx).await
    }
}

#[cfg(feature = "libjxl")]
pub use free::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jxlx-io-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_read_existing_missing_path() {
        let err = read_existing(Path::new("/definitely/not/here.jxl")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_write_with_parents_creates_ancestors() {
        let dir = scratch_dir("ancestors");
        let path = dir.join("a/b/c/out.bin");
        write_with_parents(&path, b"payload").expect("write should succeed");
        assert_eq!(read_existing(&path).expect("file should exist"), b"payload");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_write_with_parents_overwrites() {
        let dir = scratch_dir("overwrite");
        let path = dir.join("out.bin");
        write_with_parents(&path, b"first").expect("first write");
        write_with_parents(&path, b"second").expect("second write");
        assert_eq!(read_existing(&path).expect("file should exist"), b"second");
        let _ = fs::remove_dir_all(&dir);
    }
}
