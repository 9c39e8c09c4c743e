//! CSS-style colour filters: contrast, brightness and saturate.

use super::{load, store, Transform, DEFAULT_JPEG_QUALITY};
use crate::codec::EncodedImage;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One CSS-style filter function; amounts are percentages, 100 = identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjustment {
    Contrast(u32),
    Brightness(u32),
    Saturation(u32),
}

impl Adjustment {
    /// True at 100%, where the function changes nothing.
    pub fn is_identity(&self) -> bool {
        self.percent() == 100
    }

    /// The amount in percent.
    pub fn percent(&self) -> u32 {
        match *self {
            Self::Contrast(p) | Self::Brightness(p) | Self::Saturation(p) => p,
        }
    }

    /// Applies the function to one linear-in-[0, 1] RGB triple.
    fn apply(&self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        let amount = self.percent() as f32 / 100.0;
        let out = match self {
            Self::Contrast(_) => {
                let f = |c: f32| (c - 0.5) * amount + 0.5;
                [f(r), f(g), f(b)]
            }
            Self::Brightness(_) => [r * amount, g * amount, b * amount],
            Self::Saturation(_) => {
                let s = amount;
                [
                    (0.213 + 0.787 * s) * r + (0.715 - 0.715 * s) * g + (0.072 - 0.072 * s) * b,
                    (0.213 - 0.213 * s) * r + (0.715 + 0.285 * s) * g + (0.072 - 0.072 * s) * b,
                    (0.213 - 0.213 * s) * r + (0.715 - 0.715 * s) * g + (0.072 + 0.928 * s) * b,
                ]
            }
        };
        out.map(|c| c.clamp(0.0, 1.0))
    }
}

impl std::fmt::Display for Adjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contrast(p) => write!(f, "contrast({p}%)"),
            Self::Brightness(p) => write!(f, "brightness({p}%)"),
            Self::Saturation(p) => write!(f, "saturate({p}%)"),
        }
    }
}

/// Re-renders the image through a chain of filter functions.
#[derive(Debug, Clone)]
pub struct Filter {
    adjustments: Vec<Adjustment>,
    jpeg_quality: u8,
}

impl Filter {
    /// Applies `adjustments` in order.
    pub fn new(adjustments: Vec<Adjustment>) -> Self {
        Self {
            adjustments,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Sets the quality used when the output is re-encoded as JPEG.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// True when every function is at 100% and the image passes through untouched.
    pub fn is_identity(&self) -> bool {
        self.adjustments.iter().all(Adjustment::is_identity)
    }

    /// The chain in CSS `filter` syntax, e.g. `contrast(150%) saturate(80%)`.
    pub fn css(&self) -> String {
        let parts: Vec<String> = self.adjustments.iter().map(ToString::to_string).collect();
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(" ")
        }
    }
}

impl Transform for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn apply(&self, image: &EncodedImage) -> Result<EncodedImage> {
        if self.is_identity() {
            return Ok(image.clone());
        }

        let active: Vec<Adjustment> = self
            .adjustments
            .iter()
            .copied()
            .filter(|a| !a.is_identity())
            .collect();

        let mut rgba = load(image)?.to_rgba8();
        for pixel in rgba.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let mut rgb = [r, g, b].map(|c| c as f32 / 255.0);
            for adjustment in &active {
                rgb = adjustment.apply(rgb);
            }
            let [r, g, b] = rgb.map(|c| (c * 255.0).round() as u8);
            pixel.0 = [r, g, b, a];
        }

        store(&image::DynamicImage::ImageRgba8(rgba), image, self.jpeg_quality)
    }
}
