//! Retouch - prompt-driven image editing.
//!
//! Load an image, optionally crop and resize it, describe an edit in plain
//! language, let Gemini produce the edited version, then apply local
//! adjustments (contrast, brightness, saturation) before saving.
//!
//! # Quick Start
//!
//! ```no_run
//! use retouch::{Adjustments, EditorConfig, EncodedImage, Session};
//!
//! #[tokio::main]
//! async fn main() -> retouch::Result<()> {
//!     let mut session = Session::new(EditorConfig::from_env());
//!     session.load_source(EncodedImage::from_path("photo.jpg")?)?;
//!     session.resize_mut().set_percentage(50);
//!     session.set_prompt("Turn the sky into a sunset");
//!     session.generate().await?;
//!
//!     session.set_adjustments(Adjustments::default().with_contrast(120));
//!     session.refresh_adjustment().await;
//!     session.save_download(".")?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`codec`]: bytes, data URLs and base64 inline payloads
//! - [`transform`]: crop, resize and filter stages behind one [`Transform`] trait
//! - [`edit`]: the [`EditProvider`] trait and the Gemini client
//! - [`session`]: the session controller tying it together
//!
//! # Features
//!
//! - `cli`: the `retouch` command-line binary (default)

pub mod codec;
pub mod config;
pub mod edit;
mod error;
pub mod session;
pub mod transform;

#[cfg(test)]
mod test_helpers;

// Re-export error types at crate root
pub use error::{RetouchError, Result};

pub use codec::{download_extension, download_filename, EncodedImage, ImageFormat, InlinePayload};
pub use config::EditorConfig;
pub use edit::{
    EditMetadata, EditProvider, EditRequest, EditedImage, GeminiModel, GeminiProvider,
    GeminiProviderBuilder,
};
pub use session::{Adjustments, EditKind, RequestStatus, Session};
pub use transform::{
    Adjustment, Crop, CropRegion, Filter, Pipeline, Resize, ResizeMode, ResizeSpec, Transform,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::codec::EncodedImage;
    pub use crate::config::EditorConfig;
    pub use crate::edit::{EditProvider, EditRequest, GeminiProvider};
    pub use crate::error::{RetouchError, Result};
    pub use crate::session::{Adjustments, Session};
    pub use crate::transform::{CropRegion, Transform};
}
