//! Exact-size resizing and the resize options applied before an edit.

use super::{load, store, Transform, DEFAULT_JPEG_QUALITY};
use crate::codec::EncodedImage;
use crate::error::{RetouchError, Result};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Rasterizes the image at an exact width and height.
#[derive(Debug, Clone)]
pub struct Resize {
    width: u32,
    height: u32,
    jpeg_quality: u8,
}

impl Resize {
    /// Resizes to exactly `width` x `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Sets the quality used when the output is re-encoded as JPEG.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Target width and height.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Transform for Resize {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn apply(&self, image: &EncodedImage) -> Result<EncodedImage> {
        if self.width == 0 || self.height == 0 {
            return Err(RetouchError::Canvas(format!(
                "cannot resize to {}x{}",
                self.width, self.height
            )));
        }
        let raster = load(image)?;
        let resized = raster.resize_exact(self.width, self.height, FilterType::Lanczos3);
        store(&resized, image, self.jpeg_quality)
    }
}

/// How the working image should be resized before it is sent for editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ResizeMode {
    /// Send the working image at its own size.
    #[default]
    Off,
    /// Scale both sides by a percentage.
    Percentage { percent: u32 },
    /// Explicit target size.
    Pixels { width: u32, height: u32 },
}

/// Resize options with the aspect-ratio lock.
///
/// `base` is the size of the current working image. With the lock on, editing
/// one side of a `Pixels` target recomputes the other from the base ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub mode: ResizeMode,
    pub lock_aspect: bool,
    base: Option<(u32, u32)>,
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self {
            mode: ResizeMode::Off,
            lock_aspect: true,
            base: None,
        }
    }
}

impl ResizeSpec {
    /// Resizing off, aspect lock on, no base yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of the working image the target is relative to.
    pub fn base(&self) -> Option<(u32, u32)> {
        self.base
    }

    /// Rebases on a new working image; a pixel target resets to its size.
    pub fn rebase(&mut self, width: u32, height: u32) {
        self.base = Some((width, height));
        if let ResizeMode::Pixels { .. } = self.mode {
            self.mode = ResizeMode::Pixels { width, height };
        }
    }

    /// Forgets the base and turns resizing off.
    pub fn reset(&mut self) {
        *self = Self {
            lock_aspect: self.lock_aspect,
            ..Self::default()
        };
    }

    /// Turns resizing off and keeps the base.
    pub fn disable(&mut self) {
        self.mode = ResizeMode::Off;
    }

    /// Scales both sides by `percent`.
    pub fn set_percentage(&mut self, percent: u32) {
        self.mode = ResizeMode::Percentage { percent };
    }

    /// Turns the aspect-ratio lock on or off for later side edits.
    pub fn set_lock_aspect(&mut self, locked: bool) {
        self.lock_aspect = locked;
    }

    /// Sets the target width; with the lock on the height follows.
    pub fn set_width(&mut self, width: u32) {
        let current_height = self.pixel_target().map(|(_, h)| h);
        let height = match (self.lock_aspect, self.base) {
            (true, Some((bw, bh))) if bw > 0 => locked_other_side(width, bw, bh),
            _ => current_height.or(self.base.map(|(_, h)| h)).unwrap_or(width),
        };
        self.mode = ResizeMode::Pixels { width, height };
    }

    /// Sets the target height; with the lock on the width follows.
    pub fn set_height(&mut self, height: u32) {
        let current_width = self.pixel_target().map(|(w, _)| w);
        let width = match (self.lock_aspect, self.base) {
            (true, Some((bw, bh))) if bh > 0 => locked_other_side(height, bh, bw),
            _ => current_width.or(self.base.map(|(w, _)| w)).unwrap_or(height),
        };
        self.mode = ResizeMode::Pixels { width, height };
    }

    fn pixel_target(&self) -> Option<(u32, u32)> {
        match self.mode {
            ResizeMode::Pixels { width, height } => Some((width, height)),
            _ => None,
        }
    }

    /// Target size for a `width` x `height` image, or `None` when no resize applies.
    pub fn target_for(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let target = match self.mode {
            ResizeMode::Off => return None,
            ResizeMode::Percentage { percent } => (
                scale(width, percent),
                scale(height, percent),
            ),
            ResizeMode::Pixels { width, height } => (width, height),
        };
        (target != (width, height)).then_some(target)
    }
}

/// `round(side * other_base / side_base)`, never below one pixel.
fn locked_other_side(side: u32, side_base: u32, other_base: u32) -> u32 {
    let value = (side as f64 * other_base as f64 / side_base as f64).round();
    (value as u32).max(1)
}

fn scale(side: u32, percent: u32) -> u32 {
    (side as f64 * percent as f64 / 100.0).round() as u32
}
