//! Image I/O operations service
//!
//! Loading from paths, bytes and async readers, plus atomic output writes.

use crate::error::{CutoutError, Result};
use image::DynamicImage;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// The format is guessed from the extension first and from the file
    /// contents if that fails, so mislabelled files still load.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use dish_cutout::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("dish.png")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(CutoutError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    CutoutError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data)
                    .map_err(|content_err| CutoutError::image_load_error(path_ref, &content_err))
            },
        }
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_lowercase();
        let base = matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "tiff" | "tif" | "bmp");
        base || (cfg!(feature = "webp-support") && ext == "webp")
    }

    /// Decode an image from an in-memory buffer
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(CutoutError::decode("Input buffer is empty"));
        }
        image::load_from_memory(bytes)
            .map_err(|e| CutoutError::decode(format!("Failed to decode image from bytes: {}", e)))
    }

    /// Read an async stream to the end and decode it
    ///
    /// # Examples
    /// ```rust,no_run
    /// use dish_cutout::services::ImageIOService;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let file = tokio::fs::File::open("dish.jpg").await?;
    /// let image = ImageIOService::load_from_reader(file).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_from_reader<R: tokio::io::AsyncRead + Unpin>(
        mut reader: R,
    ) -> Result<DynamicImage> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| CutoutError::decode(format!("Failed to read from stream: {}", e)))?;

        Self::load_from_bytes(&buffer)
    }

    /// Write `bytes` to `path` so that `path` is either fully written or untouched.
    ///
    /// Data goes to a temporary file in the destination directory, which is
    /// flushed and then renamed over `path`. Missing parent directories are
    /// created.
    pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        let parent = match path_ref.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        std::fs::create_dir_all(parent)
            .map_err(|e| CutoutError::file_io_error("create output directory", parent, &e))?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|e| CutoutError::file_io_error("create temporary file in", parent, &e))?;
        temp.write_all(bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| CutoutError::file_io_error("write output", path_ref, &e))?;
        temp.persist(path_ref)
            .map_err(|e| CutoutError::file_io_error("move output into place at", path_ref, &e.error))?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), path_ref.display());
        Ok(())
    }

    /// Write encoded bytes to an async sink and flush it
    pub async fn write_to_writer<W: tokio::io::AsyncWrite + Unpin>(
        mut writer: W,
        bytes: &[u8],
    ) -> Result<u64> {
        use tokio::io::AsyncWriteExt;

        writer
            .write_all(bytes)
            .await
            .map_err(|e| CutoutError::encode(format!("Failed to write to stream: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| CutoutError::encode(format!("Failed to flush stream: {}", e)))?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("dish.png"));
        assert!(ImageIOService::is_supported_format("dish.JPG"));
        assert!(ImageIOService::is_supported_format("a/b/dish.tif"));
        assert!(!ImageIOService::is_supported_format("dish.txt"));
        assert!(!ImageIOService::is_supported_format("dish"));
        assert!(!ImageIOService::is_supported_format(""));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = ImageIOService::load_image("/nonexistent/dish.png").unwrap_err();
        assert!(matches!(err, CutoutError::Io(_)));
    }

    #[test]
    fn test_load_mislabelled_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dish.jpg");
        std::fs::write(&path, png_bytes()).unwrap();
        let img = ImageIOService::load_image(&path).unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));
    }

    #[test]
    fn test_load_corrupt_file_is_decode_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dish.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = ImageIOService::load_image(&path).unwrap_err();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_load_from_bytes() {
        let img = ImageIOService::load_from_bytes(&png_bytes()).unwrap();
        assert_eq!(img.to_rgba8().get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert!(ImageIOService::load_from_bytes(&[]).unwrap_err().is_decode_failure());
        assert!(ImageIOService::load_from_bytes(b"garbage").unwrap_err().is_decode_failure());
    }

    #[tokio::test]
    async fn test_load_from_reader() {
        let bytes = png_bytes();
        let img = ImageIOService::load_from_reader(Cursor::new(bytes)).await.unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));
    }

    #[test]
    fn test_write_atomic_creates_directories_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("day1").join("out.png");

        ImageIOService::write_atomic(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        ImageIOService::write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        // no temporary files left behind
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_write_to_writer() {
        let mut sink = Vec::new();
        let written = ImageIOService::write_to_writer(&mut sink, b"abc").await.unwrap();
        assert_eq!(written, 3);
        assert_eq!(sink, b"abc");
    }
}
