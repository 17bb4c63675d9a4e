//! Image intake for vision calls
//!
//! Reads a pavement photo, rejects anything the vision API should not see
//! (wrong extension, oversized, undecodable) and exposes it as MIME type +
//! base64 body.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::{Path, PathBuf};

/// Largest accepted image (10 MiB)
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Accepted file extensions, lower-case
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Image intake errors
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File type not supported: '{0}'. Allowed: jpg, jpeg, png, bmp")]
    UnsupportedType(String),

    #[error("Image file too large ({size} bytes > {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

/// A validated image ready to be sent to a vision model
#[derive(Debug, Clone)]
pub struct ImagePayload {
    name: String,
    mime_type: &'static str,
    bytes: Vec<u8>,
}

impl ImagePayload {
    /// Load and validate an image file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        check_extension(path)?;

        let metadata = fs::metadata(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        check_size(metadata.len())?;

        let bytes = fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_bytes(name, bytes)
    }

    /// Validate in-memory image bytes. `name` is used for the extension check.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ImageError> {
        let name = name.into();
        check_extension(Path::new(&name))?;
        check_size(bytes.len() as u64)?;

        let format = image::guess_format(&bytes)?;
        // Full decode so truncated or corrupt files never reach the API
        image::load_from_memory_with_format(&bytes, format)?;

        Ok(Self {
            name,
            mime_type: format.to_mime_type(),
            bytes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Standard base64 body for inline image parts
    pub fn base64_data(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

fn check_extension(path: &Path) -> Result<(), ImageError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ImageError::UnsupportedType(ext))
    }
}

fn check_size(size: u64) -> Result<(), ImageError> {
    if size > MAX_IMAGE_BYTES {
        Err(ImageError::TooLarge {
            size,
            max: MAX_IMAGE_BYTES,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    use std::io::Cursor;

    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([90, 90, 90]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode test png");
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_valid_png_from_bytes() {
        let payload = ImagePayload::from_bytes("road.PNG", tiny_png()).unwrap();
        assert_eq!(payload.mime_type(), "image/png");
        assert_eq!(payload.name(), "road.PNG");
        assert!(!payload.is_empty());
        assert!(!payload.base64_data().is_empty());
    }

    #[test]
    fn test_rejects_extension() {
        let err = ImagePayload::from_bytes("road.gif", tiny_png()).unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedType(ref e) if e == "gif"));

        let err = ImagePayload::from_bytes("road", tiny_png()).unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedType(_)));
    }

    #[test]
    fn test_rejects_oversized() {
        let bytes = vec![0u8; (MAX_IMAGE_BYTES + 1) as usize];
        let err = ImagePayload::from_bytes("big.jpg", bytes).unwrap_err();
        assert!(matches!(err, ImageError::TooLarge { .. }));
    }

    #[test]
    fn test_rejects_undecodable() {
        let err = ImagePayload::from_bytes("fake.jpg", b"not an image".to_vec()).unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.png");
        std::fs::write(&path, tiny_png()).unwrap();

        let payload = ImagePayload::load(&path).unwrap();
        assert_eq!(payload.name(), "sample.png");
        assert_eq!(payload.mime_type(), "image/png");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = ImagePayload::load(dir.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));
    }
}
