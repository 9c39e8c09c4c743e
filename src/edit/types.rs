//! Request and result types for the edit client.

use crate::codec::EncodedImage;
use serde::{Deserialize, Serialize};

/// One (image, instruction) pair sent to an edit provider.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// The image to edit.
    pub image: EncodedImage,
    /// Natural-language description of the edit.
    pub instruction: String,
}

impl EditRequest {
    /// Creates a new request.
    pub fn new(image: EncodedImage, instruction: impl Into<String>) -> Self {
        Self {
            image,
            instruction: instruction.into(),
        }
    }
}

/// Metadata about the edit call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditMetadata {
    /// Model used for the edit.
    pub model: Option<String>,
    /// Round-trip duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Any text the model returned alongside (or instead of) the image.
    pub text: Option<String>,
}

/// An image returned by a provider.
#[derive(Debug, Clone)]
#[must_use = "edited image should be saved or processed"]
pub struct EditedImage {
    /// The encoded result.
    pub image: EncodedImage,
    /// Call metadata.
    pub metadata: EditMetadata,
}

impl EditedImage {
    /// Creates a new edited image.
    pub fn new(image: EncodedImage, metadata: EditMetadata) -> Self {
        Self { image, metadata }
    }
}
