// ABOUTME: Push capability trait for container engines.
// ABOUTME: Uploads locally tagged images to a remote registry.

use crate::types::{DigestId, ImageRef};
use async_trait::async_trait;

/// Credentials for a registry push.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    /// Username.
    pub username: String,
    /// Password or token.
    pub password: String,
    /// Registry server (e.g., "registry.example.com").
    pub server: String,
}

/// Image push: upload one reference to its registry.
#[async_trait]
pub trait PushOps: Send + Sync {
    /// Push an image and return the digest the registry reported, if any.
    async fn push_image(
        &self,
        reference: &ImageRef,
        auth: &RegistryAuth,
    ) -> Result<Option<DigestId>, PushError>;
}

/// Errors from image pushes, split by how the caller should react.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Credentials were refused. Retrying cannot help.
    #[error("registry authentication failed: {0}")]
    Auth(String),

    /// The connection failed mid-flight. Retrying may help.
    #[error("transport error: {0}")]
    Transport(String),

    /// The registry refused the push for a non-auth reason.
    #[error("registry rejected push: {0}")]
    Rejected(String),
}

impl PushError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PushError::Transport(_))
    }
}
