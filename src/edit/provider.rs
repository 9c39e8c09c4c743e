//! Edit provider trait.

use crate::edit::types::{EditRequest, EditedImage};
use crate::error::Result;
use async_trait::async_trait;

/// A remote capability that edits an image according to an instruction.
///
/// Implementations make exactly one network call per [`EditProvider::edit`]
/// and never retry.
#[async_trait]
pub trait EditProvider: Send + Sync {
    /// Sends the request.
    ///
    /// `Ok(None)` means the call succeeded but no image was produced.
    async fn edit(&self, request: &EditRequest) -> Result<Option<EditedImage>>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
