// ABOUTME: Build capability trait for container engines.
// ABOUTME: Compiles a tar'd context into locally tagged images.

use crate::types::ImageRef;
use async_trait::async_trait;
use bytes::Bytes;

/// Image build: compile a context archive and tag the result.
#[async_trait]
pub trait BuildOps: Send + Sync {
    /// Build an image from a tar archive of the context and apply every tag.
    /// Engine output lines are delivered to `progress` as they arrive.
    async fn build_image(
        &self,
        context: Bytes,
        dockerfile: &str,
        tags: &[ImageRef],
        progress: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<(), BuildEngineError>;
}

/// Errors from image builds.
#[derive(Debug, thiserror::Error)]
pub enum BuildEngineError {
    #[error("build failed: {0}")]
    Failed(String),

    #[error("engine error: {0}")]
    Engine(String),
}
