use super::token::Token;
use crate::codec::EncodedImage;
use crate::error::{RetouchError, Result};
use crate::transform::{Adjustment, Filter, Transform};
use serde::{Deserialize, Serialize};

/// Post-processing applied locally to an edit result. 100 = unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustments {
    pub contrast: u32,
    pub brightness: u32,
    pub saturation: u32,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            contrast: 100,
            brightness: 100,
            saturation: 100,
        }
    }
}

impl Adjustments {
    pub fn with_contrast(mut self, percent: u32) -> Self {
        self.contrast = percent;
        self
    }

    pub fn with_brightness(mut self, percent: u32) -> Self {
        self.brightness = percent;
        self
    }

    pub fn with_saturation(mut self, percent: u32) -> Self {
        self.saturation = percent;
        self
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// The filter chain: contrast, then brightness, then saturation.
    pub fn to_filter(&self, jpeg_quality: u8) -> Filter {
        Filter::new(vec![
            Adjustment::Contrast(self.contrast),
            Adjustment::Brightness(self.brightness),
            Adjustment::Saturation(self.saturation),
        ])
        .with_jpeg_quality(jpeg_quality)
    }
}

/// A snapshot of (edit result, adjustments) waiting to be rendered.
#[derive(Debug)]
pub struct AdjustmentJob {
    pub(crate) token: Token,
    pub(crate) base: EncodedImage,
    pub(crate) filter: Filter,
}

/// What an [`AdjustmentJob`] produced, tagged with the job's token.
#[derive(Debug)]
pub struct AdjustmentOutcome {
    pub(crate) token: Token,
    pub(crate) result: Result<EncodedImage>,
}

impl AdjustmentOutcome {
    pub fn token(&self) -> Token {
        self.token
    }

    pub fn result(&self) -> std::result::Result<&EncodedImage, &RetouchError> {
        self.result.as_ref()
    }
}

impl AdjustmentJob {
    pub fn token(&self) -> Token {
        self.token
    }

    /// Renders the filter on the blocking pool.
    ///
    /// Identity filters short-circuit and hand back the base image unchanged.
    pub async fn run(self) -> AdjustmentOutcome {
        let Self {
            token,
            base,
            filter,
        } = self;

        if filter.is_identity() {
            return AdjustmentOutcome {
                token,
                result: Ok(base),
            };
        }

        tracing::debug!(filter = %filter.css(), "rendering adjustment");
        let result = tokio::task::spawn_blocking(move || filter.apply(&base))
            .await
            .unwrap_or_else(|e| Err(RetouchError::Canvas(format!("adjustment task failed: {e}"))));

        AdjustmentOutcome { token, result }
    }
}
