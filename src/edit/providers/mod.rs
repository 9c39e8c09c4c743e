//! Edit providers.

mod gemini;

pub use gemini::{GeminiModel, GeminiProvider, GeminiProviderBuilder};
