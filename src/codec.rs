//! Image bytes, data URLs and base64 inline payloads.

use crate::error::{RetouchError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Formats accepted as source images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Maps a MIME type (parameters ignored) to a supported format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::WebP => image::ImageFormat::WebP,
        }
    }
}

/// Base64 payload plus MIME type, the shape the edit API takes inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinePayload {
    /// Declared MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Standard base64 (padded) of the raw bytes.
    pub data: String,
}

impl InlinePayload {
    /// Encodes raw file bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Splits a `data:<mime>;base64,<data>` URL into its MIME type and payload.
    ///
    /// The payload itself is not decoded here; see [`InlinePayload::decode`].
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| RetouchError::Decode("not a data URL".into()))?;
        let (header, data) = rest.split_once(',').ok_or_else(|| {
            RetouchError::Decode("data URL has no comma-separated payload".into())
        })?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            RetouchError::Decode("data URL payload is not base64-encoded".into())
        })?;
        if data.is_empty() {
            return Err(RetouchError::Decode("data URL payload is empty".into()));
        }

        Ok(Self {
            mime_type: if mime_type.is_empty() {
                "text/plain".to_string()
            } else {
                mime_type.to_string()
            },
            data: data.to_string(),
        })
    }

    /// Decodes the base64 payload back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| RetouchError::Decode(e.to_string()))
    }

    /// Formats the payload as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// An encoded raster: raw bytes and the MIME type they were declared with.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Raw encoded bytes.
    pub data: Vec<u8>,
    /// Declared MIME type.
    pub mime_type: String,
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl EncodedImage {
    /// Wraps bytes with a declared MIME type.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Wraps bytes of an accepted source format (PNG, JPEG, WEBP).
    ///
    /// The format is sniffed from the bytes first; the declared type is only
    /// consulted when the bytes are too short to identify.
    pub fn from_upload(data: Vec<u8>, declared_mime: Option<&str>) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| declared_mime.and_then(ImageFormat::from_mime_type))
            .ok_or_else(|| {
                RetouchError::InvalidRequest(
                    "unsupported image type (expected PNG, JPEG or WEBP)".into(),
                )
            })?;
        Ok(Self::new(data, format.mime_type()))
    }

    /// Reads a source image from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let declared = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .map(|f| f.mime_type());
        Self::from_upload(data, declared)
    }

    /// Decodes a `data:` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        Self::from_payload(&InlinePayload::from_data_url(url)?)
    }

    /// Decodes an inline payload.
    pub fn from_payload(payload: &InlinePayload) -> Result<Self> {
        Ok(Self::new(payload.decode()?, payload.mime_type.clone()))
    }

    /// Encodes the image as an inline payload.
    pub fn to_payload(&self) -> InlinePayload {
        InlinePayload::from_bytes(&self.data, self.mime_type.clone())
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        self.to_payload().to_data_url()
    }

    /// Format detected from the bytes, falling back to the declared type.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_magic_bytes(&self.data)
            .or_else(|| ImageFormat::from_mime_type(&self.mime_type))
    }

    /// Returns true for JPEG sources, which keep their encoding when re-rasterized.
    pub fn is_jpeg(&self) -> bool {
        self.format() == Some(ImageFormat::Jpeg)
    }

    /// Reads the raster dimensions without decoding pixel data.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        let reader = image::ImageReader::new(std::io::Cursor::new(&self.data))
            .with_guessed_format()?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| RetouchError::Canvas(format!("failed to load image: {e}")))?;
        Ok((width, height))
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// File extension used when downloading this image.
    pub fn download_extension(&self) -> String {
        download_extension(Some(&self.mime_type))
    }
}

/// Infers a download extension from a MIME type.
///
/// `image/jpeg` becomes `jpg`, any other `image/<subtype>` keeps its subtype,
/// and a missing or unparseable type falls back to `png`.
pub fn download_extension(mime_type: Option<&str>) -> String {
    let subtype = mime_type
        .and_then(|m| m.split(';').next())
        .and_then(|m| m.trim().split_once('/'))
        .map(|(_, sub)| sub.trim().to_ascii_lowercase())
        .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()));

    match subtype.as_deref() {
        Some("jpeg") => "jpg".to_string(),
        Some(sub) => sub.to_string(),
        None => "png".to_string(),
    }
}

/// Builds the download filename `<stem>.<ext>` for a MIME type.
pub fn download_filename(stem: &str, mime_type: Option<&str>) -> String {
    format!("{stem}.{}", download_extension(mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{jpeg_image, png_image};

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a......"), None);
    }

    #[test]
    fn test_format_from_mime_type() {
        assert_eq!(
            ImageFormat::from_mime_type("image/JPEG"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_mime_type("image/png; charset=binary"),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::from_mime_type("image/gif"), None);
    }

    #[test]
    fn test_payload_from_bytes() {
        let payload = InlinePayload::from_bytes(b"hello", "image/png");
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.data, "aGVsbG8=");
        assert_eq!(payload.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_payload_from_data_url() {
        let payload = InlinePayload::from_data_url("data:image/webp;base64,aGVsbG8=").unwrap();
        assert_eq!(payload.mime_type, "image/webp");
        assert_eq!(payload.data, "aGVsbG8=");
        assert_eq!(
            payload.to_data_url(),
            "data:image/webp;base64,aGVsbG8="
        );
    }

    #[test]
    fn test_data_url_without_comma_is_decode_error() {
        let err = InlinePayload::from_data_url("data:image/png;base64").unwrap_err();
        assert!(matches!(err, RetouchError::Decode(_)));

        let err = InlinePayload::from_data_url("image/png;base64,aGVsbG8=").unwrap_err();
        assert!(matches!(err, RetouchError::Decode(_)));

        let err = InlinePayload::from_data_url("data:image/png,plain").unwrap_err();
        assert!(matches!(err, RetouchError::Decode(_)));
    }

    #[test]
    fn test_data_url_with_bad_base64_is_decode_error() {
        let err = EncodedImage::from_data_url("data:image/png;base64,@@@@").unwrap_err();
        assert!(matches!(err, RetouchError::Decode(_)));
    }

    #[test]
    fn test_image_data_url() {
        let image = png_image(4, 3);
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        let back = EncodedImage::from_data_url(&url).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_from_upload_sniffs_format() {
        let jpeg = jpeg_image(8, 8);
        let upload = EncodedImage::from_upload(jpeg.data.clone(), Some("image/png")).unwrap();
        assert_eq!(upload.mime_type, "image/jpeg");
        assert!(upload.is_jpeg());
    }

    #[test]
    fn test_from_upload_rejects_unsupported() {
        let err = EncodedImage::from_upload(b"GIF89a\x01\x00\x01\x00\x00\x00".to_vec(), Some("image/gif"))
            .unwrap_err();
        assert!(matches!(err, RetouchError::InvalidRequest(_)));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        png_image(5, 7).save(&path).unwrap();

        let image = EncodedImage::from_path(&path).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.dimensions().unwrap(), (5, 7));
    }

    #[test]
    fn test_dimensions_of_garbage_is_canvas_error() {
        let image = EncodedImage::new(vec![0u8; 32], "image/png");
        assert!(matches!(
            image.dimensions().unwrap_err(),
            RetouchError::Canvas(_)
        ));
    }

    #[test]
    fn test_download_extension() {
        assert_eq!(download_extension(Some("image/jpeg")), "jpg");
        assert_eq!(download_extension(Some("image/png")), "png");
        assert_eq!(download_extension(Some("image/webp")), "webp");
        assert_eq!(download_extension(Some("image/jpeg; q=1")), "jpg");
        assert_eq!(download_extension(Some("garbage")), "png");
        assert_eq!(download_extension(Some("")), "png");
        assert_eq!(download_extension(None), "png");
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(
            download_filename("edited-image", Some("image/jpeg")),
            "edited-image.jpg"
        );
        assert_eq!(download_filename("edited-image", None), "edited-image.png");
    }
}
