//! Edit request client: send an image plus an instruction, get an image back.

mod provider;
pub mod providers;
mod types;

pub use provider::EditProvider;
pub use providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};
pub use types::{EditMetadata, EditRequest, EditedImage};
