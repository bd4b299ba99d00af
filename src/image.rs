//! Image intake: validates uploaded png/jpg/jpeg files by decoding them.

use ::image::{ImageFormat as RasterFormat, ImageReader};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

use crate::agent::ImageAttachment;

/// File extensions accepted by the upload surface.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Unsupported file type '{0}' (expected png, jpg or jpeg)")]
    UnsupportedExtension(String),

    #[error("File is empty: {0}")]
    Empty(String),

    #[error("Not a PNG or JPEG image: {0}")]
    UnrecognizedFormat(String),

    #[error("Could not decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: ::image::ImageError,
    },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn media_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// An uploaded image that decoded cleanly. `name` is the original file
/// name and doubles as the thumbnail caption; `bytes` are kept as uploaded
/// and sent to the model unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub name: String,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// The format comes from the content, not the extension; the whole
    /// image must decode.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, ImageError> {
        check_extension(name)?;
        if bytes.is_empty() {
            return Err(ImageError::Empty(name.to_string()));
        }

        let reader = ImageReader::new(Cursor::new(&bytes)).with_guessed_format()?;
        let format = match reader.format() {
            Some(RasterFormat::Png) => ImageFormat::Png,
            Some(RasterFormat::Jpeg) => ImageFormat::Jpeg,
            _ => return Err(ImageError::UnrecognizedFormat(name.to_string())),
        };
        let decoded = reader.decode().map_err(|source| ImageError::Decode {
            name: name.to_string(),
            source,
        })?;
        let (width, height) = (decoded.width(), decoded.height());

        Ok(Self {
            name: name.to_string(),
            format,
            width,
            height,
            bytes,
        })
    }

    /// Read an image from disk. `~` is expanded.
    pub async fn load(path: &str) -> Result<Self, ImageError> {
        let expanded = shellexpand::tilde(path.trim()).to_string();
        let path = Path::new(&expanded);
        if !path.exists() {
            return Err(ImageError::NotFound(expanded.clone()));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&expanded)
            .to_string();

        check_extension(&name)?;
        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(&name, bytes)
    }

    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_attachment(&self) -> ImageAttachment {
        ImageAttachment {
            data: STANDARD.encode(&self.bytes),
            media_type: self.media_type().to_string(),
        }
    }
}

fn check_extension(name: &str) -> Result<(), ImageError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ImageError::UnsupportedExtension(name.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ::image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode(image: DynamicImage, format: RasterFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let pixels = RgbaImage::from_pixel(width, height, Rgba([200, 120, 40, 255]));
        encode(DynamicImage::ImageRgba8(pixels), RasterFormat::Png)
    }

    pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let pixels = RgbImage::from_pixel(width, height, Rgb([90, 90, 160]));
        encode(DynamicImage::ImageRgb8(pixels), RasterFormat::Jpeg)
    }

    #[test]
    fn test_png_dimensions() {
        let img = UploadedImage::from_bytes("diagram.PNG", png_bytes(640, 480)).unwrap();
        assert_eq!(img.format, ImageFormat::Png);
        assert_eq!((img.width, img.height), (640, 480));
        assert_eq!(img.media_type(), "image/png");
    }

    #[test]
    fn test_jpeg_dimensions() {
        let img = UploadedImage::from_bytes("cat.jpg", jpeg_bytes(1024, 768)).unwrap();
        assert_eq!(img.format, ImageFormat::Jpeg);
        assert_eq!((img.width, img.height), (1024, 768));
        assert_eq!(img.name, "cat.jpg");
    }

    #[test]
    fn test_content_wins_over_extension() {
        let img = UploadedImage::from_bytes("photo.jpeg", png_bytes(2, 2)).unwrap();
        assert_eq!(img.format, ImageFormat::Png);
    }

    #[test]
    fn test_rejects_bad_uploads() {
        assert!(matches!(
            UploadedImage::from_bytes("notes.gif", png_bytes(1, 1)),
            Err(ImageError::UnsupportedExtension(_))
        ));
        assert!(matches!(
            UploadedImage::from_bytes("noext", png_bytes(1, 1)),
            Err(ImageError::UnsupportedExtension(_))
        ));
        assert!(matches!(
            UploadedImage::from_bytes("cat.png", Vec::new()),
            Err(ImageError::Empty(_))
        ));
        assert!(matches!(
            UploadedImage::from_bytes("cat.png", b"hello world".to_vec()),
            Err(ImageError::UnrecognizedFormat(_))
        ));
        assert!(matches!(
            UploadedImage::from_bytes("cat.png", b"GIF89a\x01\x00\x01\x00\x00\x00\x00".to_vec()),
            Err(ImageError::UnrecognizedFormat(_))
        ));
        assert!(matches!(
            UploadedImage::from_bytes("cat.jpg", vec![0xFF, 0xD8, 0xFF]),
            Err(ImageError::Decode { .. })
        ));

        let mut truncated = png_bytes(10, 10);
        truncated.truncate(40);
        assert!(matches!(
            UploadedImage::from_bytes("cat.png", truncated),
            Err(ImageError::Decode { .. })
        ));
    }

    #[test]
    fn test_header_without_pixels_is_rejected() {
        // Signature and IHDR only: no CRC, no IDAT, no IEND
        let mut header = b"\x89PNG\r\n\x1a\n".to_vec();
        header.extend_from_slice(&13u32.to_be_bytes());
        header.extend_from_slice(b"IHDR");
        header.extend_from_slice(&4u32.to_be_bytes());
        header.extend_from_slice(&4u32.to_be_bytes());
        header.extend_from_slice(&[8, 6, 0, 0, 0]);

        let err = UploadedImage::from_bytes("cat.png", header).unwrap_err();
        assert!(matches!(err, ImageError::Decode { .. }));
        assert!(err.to_string().starts_with("Could not decode cat.png"));
    }

    #[test]
    fn test_attachment_is_base64() {
        let img = UploadedImage::from_bytes("a.png", png_bytes(1, 1)).unwrap();
        let attachment = img.to_attachment();
        assert_eq!(attachment.media_type, "image/png");
        assert_eq!(STANDARD.decode(attachment.data).unwrap(), img.bytes);
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.jpg");
        std::fs::write(&path, jpeg_bytes(32, 16)).unwrap();

        let img = UploadedImage::load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(img.name, "cat.jpg");
        assert_eq!((img.width, img.height), (32, 16));

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            UploadedImage::load(missing.to_str().unwrap()).await,
            Err(ImageError::NotFound(_))
        ));
    }
}
