// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Check for a local image and pull it when missing.

use crate::types::ImageRef;
use async_trait::async_trait;

/// Image operations: check existence, pull.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Check if an image exists locally.
    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError>;

    /// Pull an image from its registry.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
