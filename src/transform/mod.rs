//! Raster transforms: crop, resize and CSS-style filters.
//!
//! Every stage takes an [`EncodedImage`] and returns a new one, so stages can be
//! tested alone and chained through a [`Pipeline`]. Output keeps JPEG sources as
//! JPEG and writes everything else as PNG.

mod crop;
mod filter;
mod resize;

pub use crop::{Crop, CropRegion};
pub use filter::{Adjustment, Filter};
pub use resize::{Resize, ResizeMode, ResizeSpec};

use crate::codec::{EncodedImage, ImageFormat};
use crate::error::{RetouchError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;

/// Default JPEG quality for re-encoded JPEG sources.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// A pure image-to-image step.
pub trait Transform: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Produces a new image from `image`.
    fn apply(&self, image: &EncodedImage) -> Result<EncodedImage>;
}

/// Ordered list of transforms applied one after the other.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    /// Creates an empty pipeline (applying it returns the input unchanged).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn then(mut self, step: impl Transform + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends a step in place.
    pub fn push(&mut self, step: impl Transform + 'static) {
        self.steps.push(Box::new(step));
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if there are no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Transform for Pipeline {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn apply(&self, image: &EncodedImage) -> Result<EncodedImage> {
        let mut current = image.clone();
        for step in &self.steps {
            tracing::debug!(step = step.name(), "applying transform");
            current = step.apply(&current)?;
        }
        Ok(current)
    }
}

/// Decodes an image into a raster.
pub(crate) fn load(image: &EncodedImage) -> Result<DynamicImage> {
    let format = image.format().map(ImageFormat::to_image_format);
    let decoded = match format {
        Some(format) => image::load_from_memory_with_format(&image.data, format),
        None => image::load_from_memory(&image.data),
    };
    let raster =
        decoded.map_err(|e| RetouchError::Canvas(format!("failed to load image: {e}")))?;
    if raster.width() == 0 || raster.height() == 0 {
        return Err(RetouchError::Canvas("image has zero width or height".into()));
    }
    Ok(raster)
}

/// Encodes a raster the way `source` was encoded: JPEG stays JPEG, else PNG.
pub(crate) fn store(
    raster: &DynamicImage,
    source: &EncodedImage,
    jpeg_quality: u8,
) -> Result<EncodedImage> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(RetouchError::Canvas(
            "refusing to encode an empty image".into(),
        ));
    }

    let mut buf = Vec::new();
    if source.is_jpeg() {
        let rgb = raster.to_rgb8();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality.clamp(1, 100));
        encoder.encode_image(&rgb)?;
        Ok(EncodedImage::new(buf, ImageFormat::Jpeg.mime_type()))
    } else {
        raster.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        Ok(EncodedImage::new(buf, ImageFormat::Png.mime_type()))
    }
}
