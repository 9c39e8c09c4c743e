//! Rectangular crops, in source pixels or in preview coordinates.

use super::{load, store, Transform, DEFAULT_JPEG_QUALITY};
use crate::codec::EncodedImage;
use crate::error::{RetouchError, Result};
use serde::{Deserialize, Serialize};

/// Rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// Region with its top-left corner at (`x`, `y`).
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts a selection made on a scaled-down preview into source pixels.
    ///
    /// `display` is the size the image was shown at, `natural` its real size.
    pub fn from_display(
        selection: CropRegion,
        display: (u32, u32),
        natural: (u32, u32),
    ) -> Result<Self> {
        if display.0 == 0 || display.1 == 0 {
            return Err(RetouchError::InvalidRequest(
                "display size must be non-zero".into(),
            ));
        }
        let sx = natural.0 as f64 / display.0 as f64;
        let sy = natural.1 as f64 / display.1 as f64;
        Ok(Self {
            x: (selection.x as f64 * sx).round() as u32,
            y: (selection.y as f64 * sy).round() as u32,
            width: (selection.width as f64 * sx).round() as u32,
            height: (selection.height as f64 * sy).round() as u32,
        })
    }

    /// Intersects the region with a `width` x `height` image.
    ///
    /// Returns `None` when nothing of the region lies inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        (w > 0 && h > 0).then(|| Self::new(self.x, self.y, w, h))
    }
}

impl std::str::FromStr for CropRegion {
    type Err = String;

    /// Parses `X,Y,W,H`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, w, h] = parts[..] else {
            return Err(format!("expected X,Y,W,H, got '{s}'"));
        };
        let num = |v: &str| v.parse::<u32>().map_err(|e| format!("bad number '{v}': {e}"));
        Ok(Self::new(num(x)?, num(y)?, num(w)?, num(h)?))
    }
}

/// Cuts a rectangle out of the image.
#[derive(Debug, Clone)]
pub struct Crop {
    region: CropRegion,
    jpeg_quality: u8,
}

impl Crop {
    /// Crops to `region`, clamped to the image at apply time.
    pub fn new(region: CropRegion) -> Self {
        Self {
            region,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Sets the quality used when the output is re-encoded as JPEG.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }
}

impl Transform for Crop {
    fn name(&self) -> &'static str {
        "crop"
    }

    fn apply(&self, image: &EncodedImage) -> Result<EncodedImage> {
        let raster = load(image)?;
        let region = self
            .region
            .clamp_to(raster.width(), raster.height())
            .ok_or_else(|| {
                RetouchError::Canvas(format!(
                    "crop region {:?} does not overlap the {}x{} image",
                    self.region,
                    raster.width(),
                    raster.height()
                ))
            })?;
        let cropped = raster.crop_imm(region.x, region.y, region.width, region.height);
        store(&cropped, image, self.jpeg_quality)
    }
}
